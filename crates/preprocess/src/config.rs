/// Side length of the square model input, in pixels.
pub const DEFAULT_INPUT_SIDE: u32 = 640;
