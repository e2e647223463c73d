//! SGF (FF[4]) export of a played game.

use chrono::Utc;

use crate::game::coords::to_sgf;
use crate::game::position::PlayerMove;

/// Header and players of an exported game.
#[derive(Debug, Clone)]
pub struct SgfInfo<'a> {
    pub board_size: usize,
    pub komi: f32,
    pub result: &'a str,
    pub black_name: &'a str,
    pub white_name: &'a str,
}

/// Escapes text for a property value.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace(']', "\\]")
}

/// Builds the SGF record; `comments[i]` is attached to move `i` when present.
pub fn make_sgf(info: &SgfInfo<'_>, moves: &[PlayerMove], comments: Option<&[String]>) -> String {
    let mut sgf = format!(
        "(;GM[1]FF[4]CA[UTF-8]AP[{}:{}]RU[Chinese]\nSZ[{}]KM[{}]PW[{}]PB[{}]RE[{}]DT[{}]\n",
        crate::NAME,
        crate::VERSION,
        info.board_size,
        info.komi,
        escape(info.white_name),
        escape(info.black_name),
        escape(info.result),
        Utc::now().format("%Y-%m-%d"),
    );
    for (i, m) in moves.iter().enumerate() {
        sgf.push_str(&format!(";{}[{}]", m.color.letter(), to_sgf(m.fmove, info.board_size)));
        if let Some(comment) = comments.and_then(|c| c.get(i)) {
            sgf.push_str(&format!("C[{}]", escape(comment)));
        }
        sgf.push('\n');
    }
    sgf.push(')');
    sgf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::position::Color;

    fn info(result: &str) -> SgfInfo<'_> {
        SgfInfo {
            board_size: 9,
            komi: 7.5,
            result,
            black_name: "go_mcts",
            white_name: "go_mcts",
        }
    }

    #[test]
    fn test_sgf_contains_header_moves_and_result() {
        let moves = [
            PlayerMove {
                color: Color::Black,
                fmove: 40,
            },
            PlayerMove {
                color: Color::White,
                fmove: 81,
            },
        ];
        let sgf = make_sgf(&info("B+R"), &moves, None);
        assert!(sgf.starts_with("(;GM[1]FF[4]"));
        assert!(sgf.contains("SZ[9]KM[7.5]"));
        assert!(sgf.contains("RE[B+R]"));
        assert!(sgf.contains(";B[ee]"));
        assert!(sgf.contains(";W[]"));
        assert!(sgf.ends_with(')'));
    }

    #[test]
    fn test_comments_are_escaped() {
        let moves = [PlayerMove {
            color: Color::Black,
            fmove: 0,
        }];
        let comments = vec!["value [0.5] \\ ok".to_string()];
        let sgf = make_sgf(&info("W+2.5"), &moves, Some(&comments));
        assert!(sgf.contains(";B[aa]C[value [0.5\\] \\\\ ok]"));
    }
}
