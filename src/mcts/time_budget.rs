//! Per-move thinking time under an absolute time limit.
//!
//! Moves are played at a flat `seconds_per_move` while the remaining main time can still
//! pay for a geometrically decaying endgame; after that every own move gets
//! `decay_factor` times the previous budget. The endgame tail sums to
//! `seconds_per_move / (1 - decay_factor)`.

/// Seconds to think for the given game move number (both colors counted).
pub fn time_recommendation(
    move_number: u32,
    seconds_per_move: f64,
    time_limit: f64,
    decay_factor: f64,
) -> f64 {
    let player_move_num = f64::from(move_number / 2);

    let endgame_time = seconds_per_move / (1.0 - decay_factor);
    let (base_time, core_moves) = if endgame_time > time_limit {
        // Not even enough time for the tail: decay from the first move.
        (time_limit * (1.0 - decay_factor), 0.0)
    } else {
        (seconds_per_move, (time_limit - endgame_time) / seconds_per_move)
    };

    base_time * decay_factor.powf((player_move_num - core_moves).max(0.0))
}
