use tokio::sync::mpsc::UnboundedSender;

pub type ConnId = u64;

/// Live push channels for one room. Owned by the room's actor task, so
/// nothing here needs a lock.
#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    conns: Vec<(ConnId, UnboundedSender<String>)>,
    next_id: ConnId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tx: UnboundedSender<String>) -> ConnId {
        let id = self.next_id;
        self.next_id += 1;
        self.conns.push((id, tx));
        id
    }

    pub fn remove(&mut self, id: ConnId) {
        self.conns.retain(|(conn_id, _)| *conn_id != id);
    }

    /// Best-effort fan-out: a connection whose receiver is gone is
    /// dropped on the spot, the rest still get the payload.
    pub fn broadcast(&mut self, payload: &str) {
        self.conns.retain(|(_, tx)| tx.send(payload.to_owned()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn broadcast_reaches_every_live_connection() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(tx_a);
        registry.register(tx_b);

        registry.broadcast("hello");

        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn dead_connection_is_pruned_without_hurting_the_rest() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(tx_a);
        registry.register(tx_b);

        drop(rx_a);
        registry.broadcast("still here");

        assert_eq!(registry.len(), 1);
        assert_eq!(rx_b.recv().await.unwrap(), "still here");
    }

    #[tokio::test]
    async fn remove_takes_a_connection_out_of_the_live_set() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let id_a = registry.register(tx_a);
        registry.register(tx_b);

        registry.remove(id_a);
        registry.broadcast("bye");

        assert_eq!(registry.len(), 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.recv().await.unwrap(), "bye");
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_removal() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let id_a = registry.register(tx_a);
        registry.remove(id_a);

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let id_b = registry.register(tx_b);
        assert_ne!(id_a, id_b);
    }
}
