use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// 預覽資源登記表
///
/// 追蹤目前存活的預覽 handle 以及每個 handle 被釋放的次數，
/// 用來確認每個 handle 恰好釋放一次。
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    live: HashSet<Uuid>,
    releases: HashMap<Uuid, usize>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 為媒體檔發出一個新的預覽 handle
    pub fn issue(self: &Arc<Self>, path: &Path) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.ledger().live.insert(id);
        debug!("建立預覽 {id}: {}", path.display());

        PreviewHandle {
            id,
            uri: format!("preview://{id}"),
            registry: Arc::clone(self),
            released: false,
        }
    }

    fn release(&self, id: Uuid) {
        let mut ledger = self.ledger();
        if !ledger.live.remove(&id) {
            warn!("預覽 {id} 已釋放過，忽略重複釋放");
        }
        *ledger.releases.entry(id).or_insert(0) += 1;
        debug!("釋放預覽 {id}");
    }

    #[must_use]
    pub fn release_count(&self, id: Uuid) -> usize {
        self.ledger().releases.get(&id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.ledger().live.len()
    }

    #[must_use]
    pub fn is_live(&self, id: Uuid) -> bool {
        self.ledger().live.contains(&id)
    }
}

/// 媒體預覽 handle
///
/// 不可複製；明確 `release`、轉交 `retain`，或在被丟棄時自動釋放，
/// 三者只會發生其一。
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    uri: String,
    registry: Arc<PreviewRegistry>,
    released: bool,
}

impl PreviewHandle {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn release(mut self) {
        self.release_once();
    }

    /// 轉交給結果畫面，之後由 `RetainedPreview` 決定何時釋放
    #[must_use]
    pub fn retain(self) -> RetainedPreview {
        RetainedPreview { handle: self }
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(self.id);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

/// 結果畫面保管中的預覽
#[derive(Debug)]
pub struct RetainedPreview {
    handle: PreviewHandle,
}

impl RetainedPreview {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.handle.id()
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        self.handle.uri()
    }

    pub fn release(self) {
        self.handle.release();
    }
}
