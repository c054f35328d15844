use crate::config::Config;
use crate::event::{RawEvent, parse_events, raw_events_from_values};
use crate::scanner::{MovingAveragePoint, scan};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

/// Output path meaning standard output.
pub const STDOUT_PATH: &str = "-";

pub struct Manager {
    cfg: Config,
}

impl Manager {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Read the events, compute the series and write it out.
    ///
    /// The output is only touched once the series is complete.
    pub fn run(&self) -> Result<()> {
        let raw_events = load_events(&self.cfg.input_file).context("failed to load events")?;
        log::info!("loaded {} events", raw_events.len());

        let events = parse_events(&raw_events).context("failed to parse events")?;

        let points = scan(&events, self.cfg.window_size)
            .context("failed to compute moving averages")?;
        log::info!("computed {} points", points.len());

        let output_file = &self.cfg.output_file;
        if output_file.as_os_str() == STDOUT_PATH {
            write_points(io::stdout().lock(), &points).context("failed to write to stdout")?;
            log::info!("wrote points to stdout");
        } else {
            let file = File::create(output_file)
                .with_context(|| format!("failed to create {output_file:?}"))?;
            write_points(BufWriter::new(file), &points)
                .with_context(|| format!("failed to write {output_file:?}"))?;
            log::info!("wrote {output_file:?}");
        }

        Ok(())
    }
}

fn load_events<P: AsRef<Path>>(file: P) -> Result<Vec<RawEvent>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let reader = BufReader::new(file);

    let values: Vec<serde_json::Value> =
        serde_json::from_reader(reader).context("failed to deserialize events")?;

    raw_events_from_values(values).context("failed to read event records")
}

fn write_points<W: Write>(mut writer: W, points: &[MovingAveragePoint]) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    points
        .serialize(&mut ser)
        .context("failed to serialize points")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
