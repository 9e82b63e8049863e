//! 世代標記
//!
//! 每個非同步工作（seek/擷取、網路請求）開始時記下當時的媒體世代，
//! 完成時若世代已經改變，結果一律丟棄。

use tokio::sync::watch;

/// 世代計數器，只有擁有者可以推進
#[derive(Debug)]
pub struct GenerationCounter {
    sender: watch::Sender<u64>,
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationCounter {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        *self.sender.borrow()
    }

    /// 推進世代，之前發出的所有 token 立即失效
    pub fn advance(&self) -> u64 {
        self.sender.send_modify(|generation| *generation += 1);
        self.current()
    }

    #[must_use]
    pub fn token(&self) -> GenerationToken {
        let receiver = self.sender.subscribe();
        let generation = *receiver.borrow();
        GenerationToken {
            generation,
            receiver,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationToken {
    generation: u64,
    receiver: watch::Receiver<u64>,
}

impl GenerationToken {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        *self.receiver.borrow() == self.generation
    }

    /// 等到世代改變為止；計數器被丟棄也視為失效
    pub async fn superseded(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() != self.generation {
                return;
            }
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}
