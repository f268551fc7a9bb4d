//! Interactive alarm console.
//!
//! Reads `Start_Alarm` / `Change_Alarm` commands from stdin, feeds them to
//! the engine, and prints every engine event as a line on stdout. Parse and
//! validation failures go to stderr; EOF ends the session.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use carillon::command::{self, Command};
use carillon::error::SubmitError;
use carillon::events::render_line;
use carillon::{AlarmEngine, EngineConfig, Reporter};

#[tokio::main]
async fn main() -> Result<()> {
    carillon::tracing::init();

    let (reporter, mut events) = Reporter::channel();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render_line(&event));
        }
    });

    let engine = AlarmEngine::start(EngineConfig::default(), reporter);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("Alarm>");
        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };
        if line.trim().is_empty() {
            continue;
        }
        match command::parse(&line) {
            Ok(Command::Start(r)) => {
                let submitted = engine
                    .submit_new_alarm(r.id, r.group, r.duration_secs, &r.message)
                    .await;
                if let Err(err) = submitted {
                    // A duplicate id already showed up on the event stream.
                    if !matches!(err, SubmitError::DuplicateId(_)) {
                        eprintln!("{err}");
                    }
                }
            }
            Ok(Command::Change(r)) => {
                let submitted = engine
                    .submit_alarm_change(r.id, r.group, r.duration_secs, &r.message)
                    .await;
                if let Err(err) = submitted {
                    eprintln!("{err}");
                }
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    engine.shutdown();
    Ok(())
}
