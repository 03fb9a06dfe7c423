//! Places the info panel to the right of a rendered GIF frame.

use crate::types::RenderedFrame;

/// Gap between the GIF and the info panel.
const PANEL_PADDING: &[u8] = b"   ";
const SGR_RESET: &[u8] = b"\x1b[0m";

/// Build the terminal lines for one tick.
///
/// Each GIF row is followed by an SGR reset and, from row `offset` on, the
/// matching info line truncated to the columns left over. Rows past the end
/// of the GIF are padded with `gif_width` spaces. The result never exceeds
/// `term_h - 1` lines.
pub fn compose_frame(
    frame: &RenderedFrame,
    info: &[Vec<u8>],
    offset: usize,
    gif_width: u16,
    term: (u16, u16),
) -> Vec<Vec<u8>> {
    let gif_lines: Vec<&[u8]> = frame.lines().collect();
    let total = gif_lines
        .len()
        .max(info.len() + offset)
        .min((term.1 as usize).saturating_sub(1));

    let room = (term.0 as usize).saturating_sub(gif_width as usize + PANEL_PADDING.len());

    (0..total)
        .map(|y| {
            let mut line = Vec::new();
            match gif_lines.get(y) {
                Some(row) if !row.is_empty() => line.extend_from_slice(row),
                _ => line.resize(gif_width as usize, b' '),
            }
            line.extend_from_slice(SGR_RESET);

            if let Some(text) = y.checked_sub(offset).and_then(|i| info.get(i)) {
                line.extend_from_slice(PANEL_PADDING);
                line.extend_from_slice(&truncate_ansi(text, room));
            }
            line
        })
        .collect()
}

/// Cut `data` to `max_width` visible columns.
///
/// Escape sequences (ESC up to the next ASCII letter) take no columns, nor do
/// UTF-8 continuation bytes. A truncated line gets a trailing SGR reset so
/// its color does not bleed into what follows.
pub fn truncate_ansi(data: &[u8], max_width: usize) -> Vec<u8> {
    if max_width == 0 {
        return Vec::new();
    }

    let mut width = 0;
    let mut in_escape = false;
    let mut end = data.len();

    for (i, &b) in data.iter().enumerate() {
        if b == 0x1b {
            in_escape = true;
            continue;
        }
        if in_escape {
            if b.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }
        if b & 0xc0 != 0x80 {
            width += 1;
        }
        if width > max_width {
            end = i;
            break;
        }
    }

    let mut out = data[..end].to_vec();
    if end < data.len() {
        out.extend_from_slice(SGR_RESET);
    }
    out
}
