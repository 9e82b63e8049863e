use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 設定 Ctrl-C 處理器
///
/// 收到中斷時設定旗標並呼叫 `on_interrupt`（用來中止進行中的預測）。
#[must_use]
pub fn setup_shutdown_signal<F>(on_interrupt: F) -> Arc<AtomicBool>
where
    F: Fn() + Send + 'static,
{
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，正在安全關閉...");
        on_interrupt();
    })
    .expect("無法設定 Ctrl-C 處理器");

    shutdown_signal
}
