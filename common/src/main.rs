use minebot::{Game, Outcome};
use rand::Rng;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    let seed: u64 = rand::rng().random();
    let mut game = Game::new(10, 10, 15, seed)?;

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: exact inference first, heuristic guess otherwise.");
    println!("Seed: {seed}");
    println!("Initial Board:");
    print_board(&game);
    thread::sleep(Duration::from_secs(1));

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while game.outcome() == Outcome::InProgress {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        game.step();
        println!(
            "Revealed: {} | Flagged: {}",
            game.state().revealed_count(),
            game.state().flagged_count()
        );
        print_board(&game);

        // Delay to make the game watchable.
        thread::sleep(Duration::from_millis(300));
    }

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    match game.outcome() {
        Outcome::Won => println!("Result: The bot won!"),
        Outcome::Lost => println!("Result: The bot hit a mine and lost."),
        Outcome::InProgress => println!("Result: The game ended unexpectedly."),
    }

    Ok(())
}

fn print_board(game: &Game) {
    let state = game.state();

    // Print header
    print!("   ");
    for x in 0..state.width {
        print!("{:^3}", x);
    }
    println!("\n  +{}", "---".repeat(state.width));

    // Print rows
    for (y, row) in state.tiles().iter().enumerate() {
        print!("{:^2}|", y);
        for symbol in row {
            print!(" {} ", symbol);
        }
        println!();
    }
    println!();
}
