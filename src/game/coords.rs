//! Coordinate conversions between flat indices, GTP vertices and SGF vertices.
//!
//! Flat index `row * size + col` with row 0 at the top of the board; `size * size` is pass.
//! GTP columns skip the letter 'I' and rows count up from the bottom.

const GTP_COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

pub fn to_flat(row: usize, col: usize, size: usize) -> usize {
    row * size + col
}

/// `None` for the pass move.
pub fn from_flat(fmove: usize, size: usize) -> Option<(usize, usize)> {
    if fmove >= size * size {
        None
    } else {
        Some((fmove / size, fmove % size))
    }
}

pub fn to_gtp(fmove: usize, size: usize) -> String {
    match from_flat(fmove, size) {
        Some((row, col)) => format!("{}{}", GTP_COLUMNS[col] as char, size - row),
        None => "pass".to_string(),
    }
}

pub fn from_gtp(vertex: &str, size: usize) -> Option<usize> {
    if vertex.eq_ignore_ascii_case("pass") {
        return Some(size * size);
    }
    let bytes = vertex.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let letter = bytes[0].to_ascii_uppercase();
    let col = GTP_COLUMNS.iter().position(|&c| c == letter)?;
    let row_from_bottom: usize = vertex[1..].parse().ok()?;
    if col >= size || row_from_bottom == 0 || row_from_bottom > size {
        return None;
    }
    Some(to_flat(size - row_from_bottom, col, size))
}

/// SGF vertex ("dd"); empty string for pass.
pub fn to_sgf(fmove: usize, size: usize) -> String {
    match from_flat(fmove, size) {
        Some((row, col)) => {
            let c = (b'a' + col as u8) as char;
            let r = (b'a' + row as u8) as char;
            format!("{}{}", c, r)
        }
        None => String::new(),
    }
}

pub fn from_sgf(vertex: &str, size: usize) -> Option<usize> {
    let bytes = vertex.as_bytes();
    if bytes.is_empty() {
        return Some(size * size);
    }
    if bytes.len() != 2 {
        return None;
    }
    let col = bytes[0].checked_sub(b'a')? as usize;
    let row = bytes[1].checked_sub(b'a')? as usize;
    if row >= size || col >= size {
        // "tt" is the legacy pass encoding on boards up to 19x19
        return if size <= 19 && vertex == "tt" {
            Some(size * size)
        } else {
            None
        };
    }
    Some(to_flat(row, col, size))
}
