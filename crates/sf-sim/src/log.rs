//! Plain-text run logging.
//!
//! One header line naming the watched variables, then one whitespace
//! separated line per completed step:
//!
//! ```text
//! #time :pop :rate
//! 0.1 102.3 0.05
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use sf_compile::Operand;
use sf_core::Real;
use sf_graph::{Graph, ValueId};

/// Writes watched variable values to a text file, one line per step.
///
/// Columns are bound to slots lazily: [`RunLogger::bind`] is called on every
/// reset so a recompile (which may reassign slots) cannot leave the logger
/// pointing at stale storage, and a logger opened between resets is bound on
/// the next step. Variables that no longer exist log as `nan`.
pub struct RunLogger {
    writer: BufWriter<File>,
    columns: Vec<(ValueId, Option<Operand>)>,
    bound: bool,
}

impl RunLogger {
    /// Create the log file and write the header line.
    pub fn create(path: &Path, watched: &[ValueId]) -> std::io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "#time")?;
        for name in watched {
            write!(writer, " {name}")?;
        }
        writeln!(writer)?;
        Ok(RunLogger {
            writer,
            columns: watched.iter().map(|v| (v.clone(), None)).collect(),
            bound: false,
        })
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Re-resolve each watched variable to its current slot.
    pub fn bind(&mut self, graph: &Graph) {
        for (name, operand) in &mut self.columns {
            *operand = graph.values.get(name).and_then(|v| {
                let slot = v.slot?;
                Some(if v.kind.is_stock_like() {
                    Operand::stock(slot)
                } else {
                    Operand::flow(slot)
                })
            });
        }
        self.bound = true;
    }

    /// Append one line for the state at time `t`.
    pub fn log_line(&mut self, t: Real, flow: &[Real], stock: &[Real]) -> std::io::Result<()> {
        write!(self.writer, "{t}")?;
        for (_, operand) in &self.columns {
            match operand {
                Some(op) => write!(self.writer, " {}", op.fetch(flow, stock))?,
                None => write!(self.writer, " nan")?,
            }
        }
        writeln!(self.writer)?;
        self.writer.flush()
    }
}
