//! Live view driven by events on stdin.
//!
//! Every line of stdin is a JSON [`StatsEvent`]; every edit of the view is
//! printed as a JSON [`ModelChange`] line. Stdin is read on its own thread so
//! debounced reloads fire on time even when no further line arrives.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use actstats_core::model::{ModelChange, ResultModel};
use actstats_core::ordering::{FileOrderStore, OrderingBroker};
use actstats_core::watcher::StatsEvent;
use color_eyre::eyre::Result;

use super::output::RowLine;
use super::Env;
use crate::WatchArgs;

fn flush(model: &mut ResultModel, out: &mut impl Write) -> Result<()> {
    for change in model.take_changes() {
        writeln!(out, "{}", serde_json::to_string::<ModelChange>(&change)?)?;
    }
    out.flush()?;
    Ok(())
}

pub fn run(env: &Env, args: WatchArgs) -> Result<()> {
    let query = args.terms.to_query()?;
    let ctx = env.context();

    let broker = match &args.client {
        Some(_) => Some(OrderingBroker::new(FileOrderStore::load(&env.config.ordering_file)?)),
        None => None,
    };

    let mut builder = ResultModel::builder(query, ctx).settings(env.config.model);
    if let (Some(broker), Some(client)) = (&broker, &args.client) {
        builder = builder.ordering(broker, client);
    }
    let mut model = builder.build();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    flush(&mut model, &mut out)?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        let received = match model.next_deadline() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let line = match received {
            Ok(line) => line?,
            Err(RecvTimeoutError::Timeout) => {
                model.poll(Instant::now());
                flush(&mut model, &mut out)?;
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: StatsEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping malformed event: {}", e);
                continue;
            }
        };

        if let StatsEvent::CurrentActivityChanged { activity } = &event {
            env.activity.set_current(Some(activity.clone()));
        }

        let now = Instant::now();
        model.handle_event(&event, now);
        model.poll(now);
        flush(&mut model, &mut out)?;
    }

    // Let a pending invalidation fire before exiting.
    while let Some(deadline) = model.next_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        model.poll(Instant::now());
    }
    flush(&mut model, &mut out)?;

    if args.dump {
        for (row, record) in model.rows().iter().enumerate() {
            writeln!(out, "{}", serde_json::to_string(&RowLine { row, record })?)?;
        }
    }
    Ok(())
}
