use env_logger::Env;

/// 初始化 logger；預設只顯示 warn 以上，避免干擾互動選單
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}
