//! Arenaball headless runner
//!
//! Plays one match at the fixed timestep and prints the final snapshot as
//! JSON. Usage: `arenaball [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    fn run() -> Result<(), arenaball::ConfigError> {
        use arenaball::consts::*;
        use arenaball::sim::Match;
        use arenaball::MatchSettings;

        let settings = match std::env::args().nth(1) {
            Some(path) => MatchSettings::load(path)?,
            None => MatchSettings::default(),
        };
        let mut game = Match::new(settings)?;

        // Log once per match-clock second
        let report_every = FPS as u64;
        while !game.is_match_over() {
            game.advance_tick(SIM_DT);
            if game.ticks() % report_every == 0 {
                let snapshot = game.snapshot();
                log::debug!(
                    "t={:.0}s score {}-{}",
                    snapshot.remaining.max(0.0),
                    snapshot.scores[0],
                    snapshot.scores[1]
                );
            }
        }

        let snapshot = game.snapshot();
        log::info!(
            "Final score {}-{} after {} ticks",
            snapshot.scores[0],
            snapshot.scores[1],
            game.ticks()
        );
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to encode snapshot: {e}"),
        }
        Ok(())
    }

    env_logger::init();
    log::info!("Arenaball (headless) starting...");
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("arenaball: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless runner on the web; the library is driven by the host
}
