//! Compact reference Go board implementing [`Position`].
//!
//! Rules: captures, suicide forbidden, simple ko, game over after two consecutive passes,
//! area scoring with komi. No superko.

use crate::game::position::{Color, IllegalMove, IllegalReason, PlayerMove, Position};

pub const DEFAULT_KOMI: f32 = 7.5;

#[derive(Debug, Clone, PartialEq)]
pub struct GoBoard {
    size: usize,
    komi: f32,
    stones: Vec<Option<Color>>,
    to_play: Color,
    move_number: u32,
    ko: Option<usize>,
    recent: Vec<PlayerMove>,
}

/// Stones of one group and its liberty count.
struct Group {
    stones: Vec<usize>,
    liberties: usize,
}

impl GoBoard {
    pub fn new(size: usize, komi: f32) -> Self {
        Self {
            size,
            komi,
            stones: vec![None; size * size],
            to_play: Color::Black,
            move_number: 0,
            ko: None,
            recent: Vec::new(),
        }
    }

    pub fn ko(&self) -> Option<usize> {
        self.ko
    }

    fn neighbors(&self, point: usize) -> impl Iterator<Item = usize> {
        let size = self.size;
        let (row, col) = (point / size, point % size);
        let up = (row > 0).then(|| point - size);
        let down = (row + 1 < size).then(|| point + size);
        let left = (col > 0).then(|| point - 1);
        let right = (col + 1 < size).then(|| point + 1);
        [up, down, left, right].into_iter().flatten()
    }

    fn group_at(&self, stones: &[Option<Color>], start: usize) -> Group {
        let Some(color) = stones[start] else {
            return Group {
                stones: Vec::new(),
                liberties: 0,
            };
        };
        let mut visited = vec![false; stones.len()];
        let mut liberty_seen = vec![false; stones.len()];
        let mut group = Vec::new();
        let mut liberties = 0;
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(pt) = stack.pop() {
            group.push(pt);
            for n in self.neighbors(pt) {
                match stones[n] {
                    None => {
                        if !liberty_seen[n] {
                            liberty_seen[n] = true;
                            liberties += 1;
                        }
                    }
                    Some(c) if c == color && !visited[n] => {
                        visited[n] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        Group {
            stones: group,
            liberties,
        }
    }

    fn check_point(&self, point: usize) -> Result<(), IllegalReason> {
        if point > self.squares() {
            return Err(IllegalReason::OutOfRange);
        }
        if point == self.squares() {
            return Ok(());
        }
        if self.stones[point].is_some() {
            return Err(IllegalReason::Occupied);
        }
        if self.ko == Some(point) {
            return Err(IllegalReason::Ko);
        }
        for n in self.neighbors(point) {
            match self.stones[n] {
                None => return Ok(()),
                Some(c) => {
                    let libs = self.group_at(&self.stones, n).liberties;
                    // friendly group keeps a liberty, or the opponent group gets captured
                    if (c == self.to_play && libs > 1) || (c != self.to_play && libs == 1) {
                        return Ok(());
                    }
                }
            }
        }
        Err(IllegalReason::Suicide)
    }

    /// Area score: stones plus empty regions bordered by a single color, minus komi.
    fn area_score(&self) -> f32 {
        let mut black = 0i32;
        let mut white = 0i32;
        let mut visited = vec![false; self.stones.len()];
        for point in 0..self.stones.len() {
            match self.stones[point] {
                Some(Color::Black) => black += 1,
                Some(Color::White) => white += 1,
                None if !visited[point] => {
                    let mut region = 0i32;
                    let mut borders_black = false;
                    let mut borders_white = false;
                    let mut stack = vec![point];
                    visited[point] = true;
                    while let Some(pt) = stack.pop() {
                        region += 1;
                        for n in self.neighbors(pt) {
                            match self.stones[n] {
                                Some(Color::Black) => borders_black = true,
                                Some(Color::White) => borders_white = true,
                                None if !visited[n] => {
                                    visited[n] = true;
                                    stack.push(n);
                                }
                                None => {}
                            }
                        }
                    }
                    match (borders_black, borders_white) {
                        (true, false) => black += region,
                        (false, true) => white += region,
                        _ => {}
                    }
                }
                None => {}
            }
        }
        (black - white) as f32 - self.komi
    }
}

impl Position for GoBoard {
    fn board_size(&self) -> usize {
        self.size
    }

    fn to_play(&self) -> Color {
        self.to_play
    }

    fn move_number(&self) -> u32 {
        self.move_number
    }

    fn legal_moves(&self) -> Vec<bool> {
        (0..=self.squares())
            .map(|point| self.check_point(point).is_ok())
            .collect()
    }

    fn apply_move(&self, fmove: usize) -> Result<Self, IllegalMove> {
        self.check_point(fmove)
            .map_err(|reason| IllegalMove { fmove, reason })?;

        let mut next = self.clone();
        next.recent.push(PlayerMove {
            color: self.to_play,
            fmove,
        });
        next.to_play = self.to_play.opponent();
        next.move_number += 1;
        next.ko = None;
        if fmove == self.squares() {
            return Ok(next);
        }

        next.stones[fmove] = Some(self.to_play);
        let mut captured = Vec::new();
        for n in self.neighbors(fmove) {
            if next.stones[n] == Some(self.to_play.opponent()) {
                let group = next.group_at(&next.stones, n);
                if group.liberties == 0 {
                    for &pt in &group.stones {
                        next.stones[pt] = None;
                    }
                    captured.extend(group.stones);
                }
            }
        }

        let own = next.group_at(&next.stones, fmove);
        if captured.len() == 1 && own.stones.len() == 1 && own.liberties == 1 {
            next.ko = Some(captured[0]);
        }
        Ok(next)
    }

    fn is_game_over(&self) -> bool {
        let pass = self.squares();
        self.recent.len() >= 2 && self.recent[self.recent.len() - 2..].iter().all(|m| m.fmove == pass)
    }

    fn score(&self) -> f32 {
        self.area_score()
    }

    fn komi(&self) -> f32 {
        self.komi
    }

    fn recent_moves(&self) -> &[PlayerMove] {
        &self.recent
    }

    fn stone_at(&self, point: usize) -> Option<Color> {
        self.stones.get(point).copied().flatten()
    }

    fn liberties_at(&self, point: usize) -> usize {
        if point >= self.squares() {
            return 0;
        }
        self.group_at(&self.stones, point).liberties
    }

    fn capture_count(&self, point: usize) -> usize {
        if point >= self.squares() || self.stones[point].is_some() {
            return 0;
        }
        let opponent = self.to_play.opponent();
        let mut counted: Vec<usize> = Vec::new();
        let mut total = 0;
        for n in self.neighbors(point) {
            if self.stones[n] != Some(opponent) || counted.contains(&n) {
                continue;
            }
            let group = self.group_at(&self.stones, n);
            if group.liberties == 1 {
                total += group.stones.len();
            }
            counted.extend(group.stones);
        }
        total
    }
}
