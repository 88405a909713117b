use crate::adapters::report::LighthouseReport;
use crate::domain::model::{AuditOptions, AuditResult};
use crate::domain::ports::Auditor;
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

const DEFAULT_CHROME_FLAGS: &str = "--headless=new";
const STDERR_TAIL: usize = 600;
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// 呼叫 `lighthouse` npm CLI。每次呼叫都會啟動自己的 Chrome，
/// 稽核一個 URL，並在行程結束前關閉瀏覽器。
#[derive(Debug, Clone)]
pub struct LighthouseCli {
    binary: String,
    extra_args: Vec<String>,
}

impl LighthouseCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn build_args(&self, url: &str, options: &AuditOptions) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            "--quiet".to_string(),
        ];

        if !options.categories.is_empty() {
            args.push(format!("--only-categories={}", options.categories.join(",")));
        }

        let chrome_flags = options.chrome_flags.as_deref().unwrap_or(DEFAULT_CHROME_FLAGS);
        args.push(format!("--chrome-flags={}", chrome_flags));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl Default for LighthouseCli {
    fn default() -> Self {
        Self::new("lighthouse")
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].to_string()
}

/// 等待結束，同時讀完 stdout/stderr，避免子行程因管線塞滿而卡住
async fn collect_output(child: &mut Child) -> std::io::Result<Output> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let read_stdout = async {
        let mut buffer = Vec::new();
        if let Some(pipe) = stdout.as_mut() {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok::<_, std::io::Error>(buffer)
    };
    let read_stderr = async {
        let mut buffer = Vec::new();
        if let Some(pipe) = stderr.as_mut() {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok::<_, std::io::Error>(buffer)
    };

    let (status, stdout, stderr) = tokio::try_join!(child.wait(), read_stdout, read_stderr)?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) {
    // 負的 pid 代表整個行程群組；群組已不存在時忽略 ESRCH
    unsafe {
        libc::kill(-(pgid as libc::pid_t), signal);
    }
}

/// 對整個行程群組送 SIGTERM，等待後再送 SIGKILL，最後回收。
/// CLI 啟動的 Chrome 在同一群組，會一起結束。
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_group(pid, libc::SIGTERM);
            let _ = tokio::time::timeout(TERMINATE_GRACE, child.wait()).await;
            // lighthouse 可能已結束，但群組裡的 Chrome 仍要清掉
            signal_group(pid, libc::SIGKILL);
        }
    }

    // 非 unix 或群組訊號無效時的後備
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[async_trait]
impl Auditor for LighthouseCli {
    async fn run_audit(&self, url: &str, options: &AuditOptions) -> Result<AuditResult> {
        let args = self.build_args(url, options);
        tracing::debug!("Running {} {}", self.binary, args.join(" "));

        let mut command = std::process::Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // 自成一個行程群組，逾時時才能連 Chrome 一起結束
            command.process_group(0);
        }

        let mut child = Command::from(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BatchError::AuditError {
                url: url.to_string(),
                message: format!("failed to start {}: {}", self.binary, e),
            })?;

        let output = match options.timeout {
            Some(limit) => {
                let collected = tokio::time::timeout(limit, collect_output(&mut child)).await;
                match collected {
                    Ok(output) => output,
                    Err(_) => {
                        tracing::warn!("⏱️ {} did not finish within {:?}, stopping it", url, limit);
                        terminate(&mut child).await;
                        return Err(BatchError::TimeoutError {
                            url: url.to_string(),
                            seconds: limit.as_secs(),
                        });
                    }
                }
            }
            None => collect_output(&mut child).await,
        }
        .map_err(|e| BatchError::AuditError {
            url: url.to_string(),
            message: format!("lost contact with {}: {}", self.binary, e),
        })?;

        match serde_json::from_slice::<LighthouseReport>(&output.stdout) {
            Ok(report) => {
                if !output.status.success() {
                    tracing::debug!("{} exited with {} but produced a report", self.binary, output.status);
                }
                Ok(report.into_audit_result(&options.categories))
            }
            Err(parse_error) if output.status.success() => {
                tracing::debug!("Unreadable report for {}", url);
                Err(BatchError::SerializationError(parse_error))
            }
            Err(_) => Err(BatchError::AuditError {
                url: url.to_string(),
                message: format!("{} exited with {}: {}", self.binary, output.status, stderr_tail(&output.stderr)),
            }),
        }
    }
}
