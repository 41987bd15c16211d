//! Application facade tying the document, simulator, history and autosave
//! together behind a command interface.

use std::path::{Path, PathBuf};

use sf_graph::Graph;
use sf_sim::{Simulator, SolverParams};
use sf_project::{ModelFile, Snapshot, SolverDef, load_model, save_model};
use tracing::debug;

use crate::commands::Command;
use crate::error::{AppError, AppResult};
use crate::history::History;
use crate::saver::BackgroundSaver;

/// One open document and everything operating on it.
pub struct App {
    pub graph: Graph,
    pub solver: SolverDef,
    pub sim: Simulator,
    pub history: History,
    saver: Option<BackgroundSaver>,
}

impl Default for App {
    fn default() -> Self {
        App {
            graph: Graph::new(),
            solver: SolverDef::default(),
            sim: Simulator::default(),
            history: History::default(),
            saver: None,
        }
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable autosave to `path`.
    pub fn set_autosave(&mut self, path: PathBuf) {
        self.saver = Some(BackgroundSaver::new(path));
    }

    fn sync_solver(&mut self) {
        self.sim.params = SolverParams {
            t0: self.solver.t0,
            step: self.solver.step,
            n_steps: self.solver.n_steps,
            order: self.solver.order,
        };
    }

    /// Apply an editing command; structural edits invalidate the compiled
    /// system and are pushed to the history (subject to its own semantic
    /// filtering). Pushes are skipped while a step worker is mid-flight.
    pub fn apply(&mut self, command: Command) -> AppResult<()> {
        let records = command.records_history();
        self.execute(command)?;
        if records {
            self.sim.invalidate();
            if self.sim.is_stepping() {
                debug!("history push skipped during step");
            } else {
                self.history.push(&self.graph, self.solver.clone())?;
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: Command) -> AppResult<()> {
        match command {
            Command::AddOp(op) => {
                self.graph.add_op(op);
            }
            Command::AddVariable { name, kind, init } => {
                self.graph.add_variable(&name, kind, &init);
            }
            Command::AddIntegral { name, init } => {
                self.graph.add_integral(&name, &init);
            }
            Command::AddGodley(table) => {
                self.graph.add_godley(table);
            }
            Command::AddGroup => {
                self.graph.add_group();
            }
            Command::SetGroup { item, group } => self.graph.set_group(item, group)?,
            Command::MoveItem { item, x, y } => self.graph.move_item(item, x, y)?,
            Command::SetInit { name, init } => self.graph.set_init(&name, &init)?,
            Command::AddWire { from, to } => {
                self.graph.add_wire(from, to)?;
            }
            Command::RemoveWire(id) => self.graph.remove_wire(id)?,
            Command::RemoveItem(id) => self.graph.remove_item(id)?,
            Command::AddBookmark(bookmark) => self.graph.bookmarks.push(bookmark),
            Command::RemoveBookmark(index) => {
                if index >= self.graph.bookmarks.len() {
                    return Err(AppError::InvalidInput(format!(
                        "no bookmark at index {index}"
                    )));
                }
                self.graph.bookmarks.remove(index);
            }
            // view state lives in the frontends
            Command::MoveView { .. }
            | Command::Zoom(_)
            | Command::Select(_)
            | Command::MouseMove { .. }
            | Command::RequestRedraw => {}
        }
        Ok(())
    }

    pub fn reset(&mut self) -> AppResult<bool> {
        self.sync_solver();
        Ok(self.sim.reset(&mut self.graph)?)
    }

    pub fn step(&mut self) -> AppResult<(f64, f64)> {
        self.sync_solver();
        Ok(self.sim.step(&mut self.graph)?)
    }

    pub fn diagnose_non_finite(&self) -> Option<String> {
        self.sim.diagnose_non_finite(&self.graph)
    }

    /// Undo `n` entries (`redo` is the mirror). Refused while a step
    /// worker is running. The follow-up reset is best effort: a model
    /// that no longer compiles still undoes.
    pub fn undo(&mut self, n: i32) -> AppResult<usize> {
        if self.sim.is_stepping() {
            return Err(AppError::Busy);
        }
        let position = self.history.undo(&mut self.graph, &mut self.solver, n)?;
        self.sim.invalidate();
        self.sync_solver();
        if let Err(e) = self.sim.reset(&mut self.graph) {
            debug!(error = %e, "reset after undo failed; model left uncompiled");
        }
        Ok(position)
    }

    pub fn redo(&mut self, n: i32) -> AppResult<usize> {
        self.undo(n.saturating_neg())
    }

    /// Queue an autosave of the current state.
    pub fn autosave(&mut self) -> AppResult<()> {
        let snapshot = Snapshot::capture(&self.graph, self.solver.clone())?;
        match &mut self.saver {
            Some(saver) => saver.save(snapshot),
            None => Ok(()),
        }
    }

    /// Drop the autosave file after a clean save.
    pub fn remove_autosave(&mut self) {
        if let Some(saver) = &mut self.saver {
            saver.remove_autosave();
        }
    }

    pub fn save_file(&self, path: &Path) -> AppResult<()> {
        let file = ModelFile::from_graph(&self.graph, self.solver.clone());
        save_model(path, &file)?;
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> AppResult<()> {
        let file = load_model(path)?;
        file.populate(&mut self.graph)?;
        self.solver = file.solver;
        self.sim.invalidate();
        self.sync_solver();
        self.history.clear();
        self.history.push(&self.graph, self.solver.clone())?;
        Ok(())
    }
}
