use crate::event::{ActionKind, LoginEvent, LoginNotice};
use anyhow::{Context, Result};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Writes login records to the output stream and diagnostics to the
/// error stream.
#[derive(Debug)]
pub struct Reporter<W: WriteColor = StandardStream> {
    out: W,
    err: W,
}

impl Reporter<StandardStream> {
    pub fn stdio(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };

        Self::new(
            StandardStream::stdout(color_choice),
            StandardStream::stderr(color_choice),
        )
    }
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W, err: W) -> Self {
        Self { out, err }
    }

    #[cfg(test)]
    pub(crate) fn out(&self) -> &W {
        &self.out
    }

    #[cfg(test)]
    pub(crate) fn err(&self) -> &W {
        &self.err
    }

    pub fn print_login(&mut self, login: &LoginEvent) -> Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(
            self.out,
            "[{}] SSH login detected:",
            login.timestamp.format(DATE_TIME_FORMAT)
        )?;
        self.out.reset()?;
        writeln!(self.out)?;

        writeln!(self.out, "  • User: {}", login.user)?;
        writeln!(self.out, "  • Source IP: {}", login.source_ip)?;
        writeln!(self.out, "  • Method: {}", login.method)?;
        writeln!(self.out, "  • Port: {}", login.port)?;

        if login.actions.is_empty() {
            writeln!(self.out, "  • Actions: (none tracked)")?;
        } else {
            writeln!(self.out, "  • Actions:")?;
            for action in &login.actions {
                write!(
                    self.out,
                    "    → [{}] ",
                    action.timestamp.format(TIME_FORMAT)
                )?;
                if let Some(color) = action_color(action.kind) {
                    self.out.set_color(ColorSpec::new().set_fg(Some(color)))?;
                }
                write!(self.out, "{} {}", action.kind.glyph(), action.command)?;
                self.out.reset()?;
                writeln!(self.out)?;
            }
        }

        self.out.flush()?;
        Ok(())
    }

    pub fn print_history(&mut self, logins: &[LoginEvent]) -> Result<()> {
        if logins.is_empty() {
            return self.print_plain("No SSH login history found.");
        }

        for login in logins {
            self.print_login(login)?;
            writeln!(self.out)?;
        }

        self.out.flush()?;
        Ok(())
    }

    pub fn print_last(&mut self, login: Option<&LoginEvent>) -> Result<()> {
        match login {
            Some(login) => self.print_login(login),
            None => self.print_plain("No SSH logins found."),
        }
    }

    pub fn print_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        self.print_plain(&json)
    }

    pub fn print_notice(&mut self, notice: &LoginNotice) -> Result<()> {
        writeln!(self.out)?;
        self.out
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.out, "[NEW LOGIN]")?;
        self.out.reset()?;
        writeln!(self.out, " {}", notice.detected_at.format(DATE_TIME_FORMAT))?;
        writeln!(self.out, "  User: {}", notice.user)?;
        writeln!(self.out, "  IP: {}", notice.source_ip)?;
        writeln!(self.out, "  Method: {}", notice.method)?;
        writeln!(self.out, "  Port: {}", notice.port)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn print_plain(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn print_error(&mut self, message: &str) -> Result<()> {
        self.print_diagnostic(Color::Red, "Error", message)
    }

    pub fn print_info(&mut self, message: &str) -> Result<()> {
        self.print_diagnostic(Color::Cyan, "Info", message)
    }

    fn print_diagnostic(&mut self, color: Color, label: &str, message: &str) -> Result<()> {
        self.err.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(self.err, "{}: {}", label, message)?;
        self.err.reset()?;
        self.err.flush()?;
        Ok(())
    }
}

fn action_color(kind: ActionKind) -> Option<Color> {
    match kind {
        ActionKind::Read => Some(Color::Green),
        ActionKind::Changed => Some(Color::Yellow),
        ActionKind::Unknown => None,
    }
}
