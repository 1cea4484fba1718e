use crate::domain::effect::{Effect, NoticeLevel};
use std::fmt::Display;
use std::io::{self, Write};

/// Renders effects as plain lines for a terminal or a test harness.
pub struct EffectWriter<W: Write> {
    out: W,
}

impl<W: Write> EffectWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_effects(&mut self, effects: &[Effect]) -> io::Result<()> {
        for effect in effects {
            match effect {
                Effect::Notify(notice) => {
                    let tag = match notice.level {
                        NoticeLevel::Info => "info",
                        NoticeLevel::Success => "success",
                        NoticeLevel::Error => "error",
                    };
                    writeln!(self.out, "[{}] {}", tag, notice.message)?;
                }
                Effect::Navigate(route) => writeln!(self.out, "navigate: {}", route.path())?,
                Effect::RefreshWallet => writeln!(self.out, "refresh: wallet")?,
                Effect::RedirectToGateway(url) => writeln!(self.out, "redirect: {}", url)?,
            }
        }
        self.out.flush()
    }

    pub fn write_line(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "{}: {}", label, value)?;
        self.out.flush()
    }
}
