//! Partitioning of a token sequence into pipeline stages, and per-stage
//! execution plans with redirections separated from the argument words.

use crate::lexer::Token;
use std::fmt;
use std::path::PathBuf;

/// One command of a pipeline with its redirection operators still embedded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    pub tokens: Vec<Token>,
}

/// What a single stage needs to run: the command words and its redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    /// Command word followed by its positional arguments. Never empty.
    pub argv: Vec<String>,
    /// Target of `<`, if any.
    pub input: Option<PathBuf>,
    /// Target of `>`, if any.
    pub output: Option<PathBuf>,
}

impl StagePlan {
    /// The command word.
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the command word.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage has no command word, e.g. `ls |` or `| wc` or `> out`.
    EmptyCommand,
    /// A `<` or `>` is the last token of its stage.
    MissingRedirectTarget(Token),
    /// A `<` or `>` is directly followed by another operator.
    UnexpectedToken(Token),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyCommand => write!(f, "syntax error: empty command in pipeline"),
            PipelineError::MissingRedirectTarget(op) => {
                write!(f, "syntax error: missing file name after '{}'", op)
            }
            PipelineError::UnexpectedToken(tok) => {
                write!(f, "syntax error near unexpected token '{}'", tok)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl Stage {
    /// Separate redirections from the literal words of this stage.
    ///
    /// Each `<`/`>` consumes exactly one following word. When a stage has
    /// several redirections of the same kind the last one wins.
    pub fn plan(&self) -> Result<StagePlan, PipelineError> {
        let mut argv = Vec::new();
        let mut input = None;
        let mut output = None;

        let mut tokens = self.tokens.iter();
        while let Some(token) = tokens.next() {
            let slot = match token {
                Token::Word(w) => {
                    argv.push(w.clone());
                    continue;
                }
                Token::RedirectLeft => &mut input,
                Token::RedirectRight => &mut output,
                Token::PipeOp => return Err(PipelineError::UnexpectedToken(Token::PipeOp)),
            };
            match tokens.next() {
                Some(Token::Word(target)) => *slot = Some(PathBuf::from(target)),
                Some(other) => return Err(PipelineError::UnexpectedToken(other.clone())),
                None => return Err(PipelineError::MissingRedirectTarget(token.clone())),
            }
        }

        if argv.is_empty() {
            return Err(PipelineError::EmptyCommand);
        }
        Ok(StagePlan {
            argv,
            input,
            output,
        })
    }
}

/// Ordered chain of stages produced from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Partition `tokens` at every `|`.
    ///
    /// The final stage is always appended, so `k` pipe tokens give `k + 1`
    /// stages even when some of them are empty. Use [`Pipeline::plan`] to
    /// reject those.
    pub fn split(tokens: Vec<Token>) -> Self {
        let mut stages = Vec::new();
        let mut current = Stage::default();
        for token in tokens {
            if token == Token::PipeOp {
                stages.push(std::mem::take(&mut current));
            } else {
                current.tokens.push(token);
            }
        }
        stages.push(current);
        Pipeline { stages }
    }

    /// Plan every stage, failing on the first malformed one.
    pub fn plan(&self) -> Result<Vec<StagePlan>, PipelineError> {
        self.stages.iter().map(Stage::plan).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_into_tokens;

    fn pipeline(line: &str) -> Pipeline {
        Pipeline::split(split_into_tokens(line))
    }

    #[test]
    fn test_stage_count_is_pipes_plus_one() {
        assert_eq!(pipeline("ls").stages.len(), 1);
        assert_eq!(pipeline("ls | wc").stages.len(), 2);
        assert_eq!(pipeline("cat a | sort | uniq | wc -l").stages.len(), 4);
        assert_eq!(pipeline("ls |").stages.len(), 2);
        assert_eq!(pipeline("||").stages.len(), 3);
    }

    #[test]
    fn test_plan_strips_redirections() {
        let plans = pipeline("sort < in.txt -r > out.txt").plan().unwrap();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.argv, vec!["sort", "-r"]);
        assert_eq!(plan.name(), "sort");
        assert_eq!(plan.args(), ["-r".to_string()]);
        assert_eq!(plan.input, Some(PathBuf::from("in.txt")));
        assert_eq!(plan.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_last_redirection_wins() {
        let plans = pipeline("echo hi > a > b").plan().unwrap();
        assert_eq!(plans[0].output, Some(PathBuf::from("b")));
        assert_eq!(plans[0].argv, vec!["echo", "hi"]);
    }

    #[test]
    fn test_empty_trailing_stage_rejected() {
        assert_eq!(pipeline("ls |").plan(), Err(PipelineError::EmptyCommand));
        assert_eq!(pipeline("| wc").plan(), Err(PipelineError::EmptyCommand));
        assert_eq!(pipeline("> out").plan(), Err(PipelineError::EmptyCommand));
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            pipeline("cat <").plan(),
            Err(PipelineError::MissingRedirectTarget(Token::RedirectLeft))
        );
        assert_eq!(
            pipeline("echo a > | wc").plan(),
            Err(PipelineError::MissingRedirectTarget(Token::RedirectRight))
        );
        assert_eq!(
            pipeline("echo a > < b").plan(),
            Err(PipelineError::UnexpectedToken(Token::RedirectLeft))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PipelineError::MissingRedirectTarget(Token::RedirectRight).to_string(),
            "syntax error: missing file name after '>'"
        );
        assert_eq!(
            PipelineError::EmptyCommand.to_string(),
            "syntax error: empty command in pipeline"
        );
    }
}
