use crate::event::{Listener, ListenerId, MapEventKind};

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) kind: MapEventKind,
    pub(crate) scope: Option<String>,
    pub(crate) once: bool,
    pub(crate) listener: Listener,
}

/// Subscription table of a map, in registration order.
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    entries: Vec<ListenerEntry>,
}

impl ListenerTable {
    pub(crate) fn next_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(
        &mut self,
        kind: MapEventKind,
        scope: Option<String>,
        once: bool,
        listener: Listener,
    ) -> ListenerId {
        let id = self.next_id();
        self.entries.push(ListenerEntry {
            id,
            kind,
            scope,
            once,
            listener,
        });

        id
    }

    /// Removes the entry registered with exactly this event kind, scope and id.
    pub(crate) fn remove(
        &mut self,
        kind: &MapEventKind,
        scope: Option<&str>,
        id: ListenerId,
    ) -> bool {
        let Some(index) = self.entries.iter().position(|entry| {
            entry.id == id && entry.kind == *kind && entry.scope.as_deref() == scope
        }) else {
            return false;
        };

        self.entries.remove(index);
        true
    }

    pub(crate) fn remove_id(&mut self, id: ListenerId) -> bool {
        let len = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != len
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Snapshot of the entries listening for `kind`.
    pub(crate) fn matching(&self, kind: &MapEventKind) -> Vec<ListenerEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == *kind)
            .cloned()
            .collect()
    }

    pub(crate) fn count(&self, kind: &MapEventKind, scope: Option<&str>) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.kind == *kind && entry.scope.as_deref() == scope)
            .count()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::listener;

    #[test]
    fn remove_requires_matching_scope() {
        let mut table = ListenerTable::default();
        let id = table.insert(
            MapEventKind::Click,
            Some("roads".into()),
            false,
            listener(|_, _| {}),
        );

        assert!(!table.remove(&MapEventKind::Click, None, id));
        assert!(!table.remove(&MapEventKind::Click, Some("water"), id));
        assert!(!table.remove(&MapEventKind::DblClick, Some("roads"), id));
        assert!(table.remove(&MapEventKind::Click, Some("roads"), id));
        assert!(!table.remove(&MapEventKind::Click, Some("roads"), id));
    }

    #[test]
    fn ids_are_unique() {
        let mut table = ListenerTable::default();
        let id1 = table.insert(MapEventKind::Load, None, true, listener(|_, _| {}));
        let id2 = table.insert(MapEventKind::Load, None, true, listener(|_, _| {}));

        assert_ne!(id1, id2);
        assert_eq!(table.count(&MapEventKind::Load, None), 2);
        assert_eq!(table.matching(&MapEventKind::Load).len(), 2);
    }
}
