use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("无效的响应数据: {0}")]
    MalformedResponse(String),

    #[error("状态文件错误: {0}")]
    Persistence(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("服务错误: {0}")]
    Server(String),
}

impl ScannerError {
    /// 是否为远程调用失败（传输错误或非成功状态码）
    pub fn is_network(&self) -> bool {
        matches!(self, ScannerError::Network(_) | ScannerError::HttpStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScannerError>;
