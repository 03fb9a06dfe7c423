use std::fs::File;
use std::path::Path;

pub const BLUE: [u8; 3] = [0, 0, 255];
pub const RED: [u8; 3] = [255, 0, 0];

/// One frame of a synthetic GIF: a solid palette-colored rectangle.
pub struct Square {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub color: [u8; 3],
    pub dispose: gif::DisposalMethod,
}

/// Write a GIF with a `size` × `size` canvas made of `frames`.
pub fn write_gif(path: &Path, size: u16, frames: &[Square]) {
    let file = File::create(path).unwrap();
    let mut encoder = gif::Encoder::new(file, size, size, &[]).unwrap();
    for square in frames {
        let pixels = vec![0u8; square.width as usize * square.height as usize];
        let mut frame = gif::Frame::from_palette_pixels(
            square.width,
            square.height,
            pixels,
            [square.color, [0, 0, 0]].concat(),
            None,
        );
        frame.left = square.left;
        frame.top = square.top;
        frame.dispose = square.dispose;
        encoder.write_frame(&frame).unwrap();
    }
}

pub fn glyph(top: [u8; 3], bottom: [u8; 3]) -> String {
    format!(
        "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m\u{2580}",
        top[0], top[1], top[2], bottom[0], bottom[1], bottom[2]
    )
}
