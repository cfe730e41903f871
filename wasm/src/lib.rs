use minebot as mb;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn new_game(width: usize, height: usize, mines: usize, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let game = mb::Game::new(width, height, mines, seed).map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn step(bts: Vec<u8>) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.step();
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn run_to_completion(bts: Vec<u8>) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.run_to_completion();
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn reveal(bts: Vec<u8>, x: usize, y: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.reveal(mb::Point { x, y }).map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn flag(bts: Vec<u8>, x: usize, y: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    game.flag(mb::Point { x, y }).map_err(|e| e.to_string())?;
    game.serialize().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn outcome(bts: Vec<u8>) -> Result<i8, String> {
    console_error_panic_hook::set_once();

    let game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(match game.outcome() {
        mb::Outcome::InProgress => 0,
        mb::Outcome::Won => 1,
        mb::Outcome::Lost => 2,
    })
}

#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let game = mb::Game::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(game
        .state()
        .cells
        .iter()
        .flatten()
        .map(|cell| match cell {
            mb::CellState::Hidden => -1,
            mb::CellState::Flagged => -2,
            mb::CellState::Exploded => -3,
            mb::CellState::Revealed(n) => *n as i8,
        })
        .collect())
}
