//! Compilation state shared by every pass over one source file.

use crate::diag::{MessageText, Messages};
use crate::source::Source;
use crate::symbols::Symbols;
use std::fmt;
use std::str::FromStr;

/// Stage of the fixed compilation sequence, in execution order.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Default)]
pub enum PassStep {
    #[default]
    Init,
    Lex,
    Parse,
    Check,
    Eval,
    Final,
}

impl PassStep {
    pub const ALL: [PassStep; 6] = [
        Self::Init,
        Self::Lex,
        Self::Parse,
        Self::Check,
        Self::Eval,
        Self::Final,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Lex => "Lex",
            Self::Parse => "Parse",
            Self::Check => "Check",
            Self::Eval => "Eval",
            Self::Final => "Final",
        }
    }
}

impl fmt::Display for PassStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("no known pass step named {0:?}")]
pub struct ParseStepError(pub String);

impl FromStr for PassStep {
    type Err = ParseStepError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStepError(s.to_string()))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The run stops once this step has been reached.
    pub last_step: PassStep,
    /// Passes that keep going after an error give up at this many errors.
    pub max_errors: usize,
    /// Color message kinds when rendering diagnostics.
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_step: PassStep::Final,
            max_errors: 20,
            color: false,
        }
    }
}

pub struct Context {
    pub source: Source,
    pub messages: Messages,
    pub config: Config,
    /// Definitions seen while parsing, for the checker.
    pub symbols: Symbols,
    /// Later definitions replace earlier ones of the same name.
    pub allow_overrides: bool,
    step: PassStep,
}

impl Context {
    pub fn new(source: Source, config: Config) -> Self {
        Self {
            source,
            messages: Messages::new(),
            config,
            symbols: Symbols::default(),
            allow_overrides: false,
            step: PassStep::Init,
        }
    }

    pub fn step(&self) -> PassStep {
        self.step
    }

    /// Enter `step`. Steps only move forward; an attempt to go back is
    /// reported and ignored.
    pub fn start_step(&mut self, step: PassStep) {
        if step < self.step {
            let location = self.source.location();
            self.messages.internal_error(
                location,
                MessageText::StepRegressed {
                    from: self.step,
                    to: step,
                },
            );
            return;
        }
        tracing::debug!(%step, file = %self.source.name, "starting step");
        self.step = step;
    }

    /// Whether the run should stop: the configured last step was reached or
    /// something went wrong.
    pub fn done(&self) -> bool {
        self.step >= self.config.last_step || self.messages.has_errors()
    }

    pub fn error_limit_reached(&self) -> bool {
        self.messages.error_count() >= self.config.max_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(last_step: PassStep) -> Context {
        let config = Config {
            last_step,
            ..Config::default()
        };
        Context::new(Source::new("<filename>", "x"), config)
    }

    #[test]
    fn step_names_ignore_case() {
        assert_eq!("lex".parse::<PassStep>(), Ok(PassStep::Lex));
        assert_eq!("FINAL".parse::<PassStep>(), Ok(PassStep::Final));
        assert_eq!("Check".parse::<PassStep>(), Ok(PassStep::Check));
        let error = "codegen".parse::<PassStep>().unwrap_err();
        assert_eq!(error.to_string(), "no known pass step named \"codegen\"");
    }

    #[test]
    fn done_at_last_step() {
        let mut ctx = context(PassStep::Parse);
        ctx.start_step(PassStep::Lex);
        assert!(!ctx.done());
        ctx.start_step(PassStep::Parse);
        assert!(ctx.done());
    }

    #[test]
    fn done_on_error() {
        let mut ctx = context(PassStep::Final);
        ctx.start_step(PassStep::Lex);
        let location = ctx.source.location();
        ctx.messages.warning(location, MessageText::UnterminatedLine);
        assert!(!ctx.done());
        ctx.messages.error(location, MessageText::UnexpectedCharacter);
        assert!(ctx.done());
    }

    #[test]
    fn steps_never_regress() {
        let mut ctx = context(PassStep::Final);
        ctx.start_step(PassStep::Check);
        ctx.start_step(PassStep::Lex);
        assert_eq!(ctx.step(), PassStep::Check);
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(
            ctx.messages[0].text.to_string(),
            "Pass step regressed from Check to Lex"
        );
    }

    #[test]
    fn error_limit() {
        let mut ctx = Context::new(
            Source::new("<filename>", "x"),
            Config {
                max_errors: 2,
                ..Config::default()
            },
        );
        let location = ctx.source.location();
        ctx.messages.error(location, MessageText::ExpectedDefinition);
        assert!(!ctx.error_limit_reached());
        ctx.messages.error(location, MessageText::ExpectedDefinition);
        assert!(ctx.error_limit_reached());
    }
}
