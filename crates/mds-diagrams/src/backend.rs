//! Render backend.
//!
//! [`RenderBackend`] is the seam between orchestration and the program that
//! actually draws diagrams. [`MermaidCli`] drives `@mermaid-js/mermaid-cli`
//! through `npx` or `pnpx`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use mds_config::{BackendCommand, RunConfig};

use crate::command::{self, CommandError};
use crate::request::ResolvedRenderRequest;

/// Render backend error.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to start renderer: {0}")]
    Spawn(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "renderer exited with {}: {stderr}",
        .code.map_or_else(|| "signal".to_owned(), |c| format!("code {c}"))
    )]
    Exit { code: Option<i32>, stderr: String },
    #[error("renderer timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<CommandError> for BackendError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Timeout { timeout, .. } => Self::Timeout(timeout),
            CommandError::Spawn { .. } => Self::Spawn(err.to_string()),
            CommandError::Wait { source, .. } => Self::Io(source),
        }
    }
}

/// Produces a diagram artifact from Mermaid source.
///
/// Implementations must be callable from several render workers at once.
pub trait RenderBackend: Send + Sync {
    /// Render `source` to `target` in the format given by
    /// `request.output_format.backend_format()`.
    fn render(
        &self,
        source: &str,
        target: &Path,
        request: &ResolvedRenderRequest,
    ) -> Result<(), BackendError>;
}

/// Renders through the Mermaid CLI (`mmdc`) launched by a package runner.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    runner: String,
    package: String,
    timeout: Option<Duration>,
}

impl MermaidCli {
    /// Create a backend for the given runner and package.
    ///
    /// `BackendCommand::Auto` prefers `pnpx` when it is on `PATH`.
    #[must_use]
    pub fn new(command: BackendCommand, package: impl Into<String>) -> Self {
        Self {
            runner: runner_program(command).to_owned(),
            package: package.into(),
            timeout: None,
        }
    }

    /// Create a backend from the run configuration.
    #[must_use]
    pub fn from_run_config(run: &RunConfig) -> Self {
        Self::new(run.backend_command, run.cli_package.clone()).with_timeout(run.render_timeout)
    }

    /// Set the per-diagram timeout (`None` waits indefinitely).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Package runner program (`npx` or `pnpx`).
    #[must_use]
    pub fn runner(&self) -> &str {
        &self.runner
    }

    /// Build the argument list passed to the package runner.
    fn args(&self, input: &Path, target: &Path, request: &ResolvedRenderRequest) -> Vec<String> {
        let mut args = vec![
            self.package.clone(),
            "-i".to_owned(),
            input.display().to_string(),
            "-o".to_owned(),
            target.display().to_string(),
        ];

        if let Some(theme) = request.theme.builtin() {
            args.extend(["-t".to_owned(), theme.as_str().to_owned()]);
        }
        if let Some(width) = request.width {
            args.extend(["-w".to_owned(), width.to_string()]);
        }
        if let Some(height) = request.height {
            args.extend(["-H".to_owned(), height.to_string()]);
        }
        if let Some(color) = &request.background_color {
            args.extend(["-b".to_owned(), color.clone()]);
        }
        if let Some(path) = existing_file(request.config_file.as_deref(), "config") {
            args.extend(["-c".to_owned(), path.display().to_string()]);
        }
        if let Some(path) = existing_file(request.css_file.as_deref(), "CSS") {
            args.extend(["-C".to_owned(), path.display().to_string()]);
        }
        if let Some(scale) = request.scale {
            args.extend(["-s".to_owned(), scale.to_string()]);
        }
        if request.pdf_fit {
            args.push("-f".to_owned());
        }
        if let Some(id) = &request.element_id {
            args.extend(["-I".to_owned(), id.clone()]);
        }

        args
    }
}

impl RenderBackend for MermaidCli {
    fn render(
        &self,
        source: &str,
        target: &Path,
        request: &ResolvedRenderRequest,
    ) -> Result<(), BackendError> {
        let input_dir = tempfile::tempdir()?;
        let input = input_dir.path().join("diagram.mmd");
        std::fs::write(&input, source)?;

        let args = self.args(&input, target, request);
        tracing::debug!(runner = %self.runner, args = ?args, "Running Mermaid CLI");

        let mut cmd = Command::new(&self.runner);
        cmd.args(&args);
        let output = command::run(cmd, self.timeout)?;

        if !output.stdout.trim().is_empty() {
            tracing::debug!(stdout = %output.stdout.trim(), "Mermaid CLI output");
        }
        if !output.success {
            return Err(BackendError::Exit {
                code: output.code,
                stderr: output.stderr.trim().to_owned(),
            });
        }
        if !output.stderr.trim().is_empty() {
            tracing::debug!(stderr = %output.stderr.trim(), "Mermaid CLI diagnostics");
        }

        if !target.exists() {
            return Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("renderer produced no file at {}", target.display()),
            )));
        }

        Ok(())
    }
}

fn runner_program(command: BackendCommand) -> &'static str {
    match command {
        BackendCommand::Npx => "npx",
        BackendCommand::Pnpx => "pnpx",
        BackendCommand::Auto => {
            if which::which("pnpx").is_ok() {
                "pnpx"
            } else {
                "npx"
            }
        }
    }
}

/// Return `path` if it names an existing file, warning otherwise.
fn existing_file<'a>(path: Option<&'a Path>, kind: &str) -> Option<&'a Path> {
    let path = path?;
    if path.is_file() {
        Some(path)
    } else {
        tracing::warn!(path = %path.display(), "{kind} file not found, ignoring");
        None
    }
}

/// File inside `dir` that the backend renders to before the artifact is placed.
pub(crate) fn intermediate_path(dir: &Path, request: &ResolvedRenderRequest) -> PathBuf {
    dir.join(format!(
        "diagram.{}",
        request.output_format.backend_format().extension()
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mds_config::{BuiltinTheme, OutputFormat, ThemeChoice};
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    /// Backend running a shell script in place of the Mermaid CLI package.
    ///
    /// The script copies the source to the target, and for sources containing
    /// "hang" first starts a background process and blocks, like a runner
    /// whose renderer never returns.
    #[cfg(unix)]
    pub(crate) fn script_backend(dir: &Path, timeout: Duration) -> MermaidCli {
        let script = dir.join("fake-mmdc.sh");
        std::fs::write(
            &script,
            "if grep -q hang \"$2\"; then\n  sleep 30 &\n  sleep 30\nfi\ncp \"$2\" \"$4\"\n",
        )
        .unwrap();
        MermaidCli {
            runner: "sh".to_owned(),
            package: script.display().to_string(),
            timeout: Some(timeout),
        }
    }

    fn request() -> ResolvedRenderRequest {
        ResolvedRenderRequest {
            theme: ThemeChoice::Builtin(BuiltinTheme::Default),
            width: None,
            height: None,
            background_color: None,
            scale: None,
            output_format: OutputFormat::Svg,
            config_file: None,
            css_file: None,
            pdf_fit: false,
            element_id: None,
        }
    }

    fn cli() -> MermaidCli {
        MermaidCli::new(BackendCommand::Npx, "@mermaid-js/mermaid-cli@11.4.2")
    }

    #[test]
    fn test_args_minimal() {
        let args = cli().args(Path::new("in.mmd"), Path::new("out.svg"), &request());

        assert_eq!(
            args,
            vec![
                "@mermaid-js/mermaid-cli@11.4.2",
                "-i",
                "in.mmd",
                "-o",
                "out.svg",
                "-t",
                "default"
            ]
        );
    }

    #[test]
    fn test_args_all_options() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("mermaid.json");
        let css = temp.path().join("style.css");
        std::fs::write(&config, "{}").unwrap();
        std::fs::write(&css, "").unwrap();

        let request = ResolvedRenderRequest {
            theme: ThemeChoice::Builtin(BuiltinTheme::Dark),
            width: Some(800),
            height: Some(600),
            background_color: Some("transparent".to_owned()),
            scale: Some(2.0),
            config_file: Some(config.clone()),
            css_file: Some(css.clone()),
            pdf_fit: true,
            element_id: Some("flow".to_owned()),
            ..request()
        };

        let args = cli().args(Path::new("in.mmd"), Path::new("out.pdf"), &request);

        assert_eq!(
            args[5..].to_vec(),
            vec![
                "-t".to_owned(),
                "dark".to_owned(),
                "-w".to_owned(),
                "800".to_owned(),
                "-H".to_owned(),
                "600".to_owned(),
                "-b".to_owned(),
                "transparent".to_owned(),
                "-c".to_owned(),
                config.display().to_string(),
                "-C".to_owned(),
                css.display().to_string(),
                "-s".to_owned(),
                "2".to_owned(),
                "-f".to_owned(),
                "-I".to_owned(),
                "flow".to_owned(),
            ]
        );
    }

    #[test]
    fn test_args_custom_theme_has_no_theme_flag() {
        let request = ResolvedRenderRequest {
            theme: ThemeChoice::Custom("ocean".to_owned()),
            ..request()
        };

        let args = cli().args(Path::new("in.mmd"), Path::new("out.svg"), &request);

        assert!(!args.contains(&"-t".to_owned()));
    }

    #[test]
    fn test_args_missing_files_omitted() {
        let request = ResolvedRenderRequest {
            config_file: Some(PathBuf::from("/nonexistent/mermaid.json")),
            css_file: Some(PathBuf::from("/nonexistent/style.css")),
            ..request()
        };

        let args = cli().args(Path::new("in.mmd"), Path::new("out.svg"), &request);

        assert!(!args.contains(&"-c".to_owned()));
        assert!(!args.contains(&"-C".to_owned()));
    }

    #[test]
    fn test_explicit_runner() {
        assert_eq!(cli().runner(), "npx");
        assert_eq!(MermaidCli::new(BackendCommand::Pnpx, "pkg").runner(), "pnpx");
    }

    #[test]
    fn test_intermediate_path_uses_backend_format() {
        let request = ResolvedRenderRequest {
            output_format: OutputFormat::EnhancedSvg,
            ..request()
        };

        assert_eq!(
            intermediate_path(Path::new("/tmp/x"), &request),
            PathBuf::from("/tmp/x/diagram.pdf")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_render_through_runner() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("out.svg");
        let backend = script_backend(temp.path(), Duration::from_secs(10));

        backend.render("graph TD\n  A --> B", &target, &request()).unwrap();

        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "graph TD\n  A --> B"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_render_timeout() {
        let temp = tempfile::tempdir().unwrap();
        let backend = script_backend(temp.path(), Duration::from_millis(300));
        let start = Instant::now();

        let err = backend
            .render("graph TD\n  hang", &temp.path().join("out.svg"), &request())
            .unwrap_err();

        assert!(matches!(err, BackendError::Timeout(t) if t == Duration::from_millis(300)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_exit_error_message() {
        let err = BackendError::Exit {
            code: Some(1),
            stderr: "Parse error on line 2".to_owned(),
        };

        assert_eq!(
            err.to_string(),
            "renderer exited with code 1: Parse error on line 2"
        );
    }
}
