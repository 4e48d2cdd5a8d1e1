use fourinrow_engine::board::{Board, COLS, ROWS};
use fourinrow_engine::errors::MoveError;
use fourinrow_engine::game::{Game, GameStatus, Outcome};
use fourinrow_engine::player::{Color, Participant};
use fourinrow_engine::rules::{apply_move, check_win};

fn new_game() -> Game {
    Game::new(
        "game-1",
        Participant::human("a", "alice", Color::One),
        Participant::human("b", "bob", Color::Two),
    )
}

/// Every start cell and direction of a line of four that fits on the grid.
fn all_lines() -> Vec<[(usize, usize); 4]> {
    let mut lines = Vec::new();
    for (dr, dc) in [(0isize, 1isize), (1, 0), (1, 1), (-1, 1)] {
        for row in 0..ROWS as isize {
            for col in 0..COLS as isize {
                let cells: Vec<(isize, isize)> =
                    (0..4).map(|i| (row + dr * i, col + dc * i)).collect();
                if cells
                    .iter()
                    .all(|&(r, c)| (0..ROWS as isize).contains(&r) && (0..COLS as isize).contains(&c))
                {
                    let mut line = [(0, 0); 4];
                    for (slot, (r, c)) in line.iter_mut().zip(cells) {
                        *slot = (r as usize, c as usize);
                    }
                    lines.push(line);
                }
            }
        }
    }
    lines
}

fn board_with(cells: &[(usize, usize)], value: u8) -> Board {
    let mut rows = [[0u8; COLS]; ROWS];
    for &(r, c) in cells {
        rows[r][c] = value;
    }
    Board::from_rows(rows).expect("valid rows")
}

#[test]
fn grid_has_sixty_nine_lines_of_four() {
    assert_eq!(all_lines().len(), 69);
}

#[test]
fn every_line_of_four_is_a_win_and_three_of_it_is_not() {
    for line in all_lines() {
        let full = board_with(&line, 1);
        assert!(check_win(&full, Color::One), "line {line:?} should win");
        assert!(!check_win(&full, Color::Two));
        for &(r, c) in &line {
            assert!(full.wins_through(r, c));
        }

        for skip in 0..4 {
            let partial: Vec<_> = line
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, cell)| *cell)
                .collect();
            assert!(!check_win(&board_with(&partial, 1), Color::One));
        }
    }
}

#[test]
fn interrupted_line_is_not_a_win() {
    let board = Board::from_rows([
        [0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 2, 1, 1, 1],
    ])
    .expect("valid rows");
    assert!(!check_win(&board, Color::One));
    assert!(!board.wins_through(5, 2));
}

#[test]
fn winning_move_finishes_once_and_blocks_further_moves() {
    let mut game = new_game();
    for _ in 0..3 {
        apply_move(&mut game, "a", 0).expect("a");
        apply_move(&mut game, "b", 1).expect("b");
    }
    apply_move(&mut game, "a", 0).expect("winning move");

    assert_eq!(game.status(), GameStatus::Finished);
    assert_eq!(
        game.outcome(),
        Some(&Outcome::Win {
            participant: "a".into()
        })
    );
    assert_eq!(apply_move(&mut game, "b", 1), Err(MoveError::NotActive));
    assert_eq!(apply_move(&mut game, "a", 2), Err(MoveError::NotActive));
    assert!(!game.finish(Outcome::Draw));
    assert_eq!(
        game.outcome(),
        Some(&Outcome::Win {
            participant: "a".into()
        })
    );
}

#[test]
fn full_board_without_a_line_is_a_draw() {
    let columns = [
        5, 3, 2, 3, 1, 5, 3, 1, 0, 1, 4, 1, 2, 5, 0, 5, 6, 6, 2, 0, 6, 0, 4, 2, 3, 0, 3, 4, 2, 3,
        2, 6, 0, 4, 1, 1, 5, 4, 4, 5, 6, 6,
    ];
    let mut game = new_game();
    for (i, col) in columns.iter().enumerate() {
        assert!(game.is_active(), "game ended early at move {i}");
        let who = game.current_turn().to_string();
        apply_move(&mut game, &who, *col).expect("legal move");
    }
    assert!(game.board().is_full());
    assert_eq!(game.status(), GameStatus::Finished);
    assert_eq!(game.outcome(), Some(&Outcome::Draw));
    assert!(!check_win(game.board(), Color::One));
    assert!(!check_win(game.board(), Color::Two));
}

#[test]
fn column_three_tower_wins_for_seat_one() {
    let mut game = new_game();
    let expected_rows = [5, 4, 3, 2];
    let b_columns = [0, 1, 2];

    for (turn, expected_row) in expected_rows.iter().enumerate() {
        let placement = apply_move(&mut game, "a", 3).expect("a drops into column 3");
        assert_eq!(placement.row, *expected_row);
        if turn < b_columns.len() {
            assert!(!check_win(game.board(), Color::One));
            apply_move(&mut game, "b", b_columns[turn]).expect("b moves elsewhere");
        }
    }

    assert!(check_win(game.board(), Color::One));
    assert_eq!(game.status(), GameStatus::Finished);
    assert_eq!(
        game.outcome(),
        Some(&Outcome::Win {
            participant: "a".into()
        })
    );
}
