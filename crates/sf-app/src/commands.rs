//! Editing commands and their history classification.

use sf_core::{ItemId, PortId, Real, WireId};
use sf_graph::{Bookmark, GodleyTable, OpKind, VarKind};

/// Everything a frontend can ask the application to do to the document.
///
/// The view and pointer-tracking variants exist so frontends can funnel all
/// interaction through one channel; they carry no model state.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddOp(OpKind),
    AddVariable {
        name: String,
        kind: VarKind,
        init: String,
    },
    AddIntegral {
        name: String,
        init: String,
    },
    AddGodley(GodleyTable),
    AddGroup,
    SetGroup {
        item: ItemId,
        group: Option<ItemId>,
    },
    MoveItem {
        item: ItemId,
        x: Real,
        y: Real,
    },
    SetInit {
        name: String,
        init: String,
    },
    AddWire {
        from: PortId,
        to: PortId,
    },
    RemoveWire(WireId),
    RemoveItem(ItemId),
    AddBookmark(Bookmark),
    RemoveBookmark(usize),

    // view and pointer tracking; never recorded
    MoveView {
        x: Real,
        y: Real,
    },
    Zoom(Real),
    Select(Option<ItemId>),
    MouseMove {
        x: Real,
        y: Real,
    },
    RequestRedraw,
}

impl Command {
    /// Whether applying this command should attempt a history push. View
    /// and pointer-tracking commands never do; everything else goes
    /// through the history's own semantic comparison, which still filters
    /// out pure layout changes.
    pub fn records_history(&self) -> bool {
        !matches!(
            self,
            Command::MoveView { .. }
                | Command::Zoom(_)
                | Command::Select(_)
                | Command::MouseMove { .. }
                | Command::RequestRedraw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_commands_do_not_record() {
        assert!(!Command::MouseMove { x: 1.0, y: 2.0 }.records_history());
        assert!(!Command::Zoom(1.5).records_history());
        assert!(!Command::Select(None).records_history());
        assert!(!Command::RequestRedraw.records_history());
        assert!(!Command::MoveView { x: 0.0, y: 0.0 }.records_history());
    }

    #[test]
    fn mutations_record() {
        assert!(Command::AddOp(OpKind::Add).records_history());
        assert!(
            Command::SetInit {
                name: ":x".to_string(),
                init: "1".to_string(),
            }
            .records_history()
        );
        assert!(Command::MoveItem { item: sf_core::Id::from_index(0), x: 1.0, y: 1.0 }.records_history());
    }
}
