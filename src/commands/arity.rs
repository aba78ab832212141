use super::CommandSpec;
use crate::eval::{Classification, CommandContext};

/// Commands that only view state when given at most `max_args` arguments
/// (`hostname` prints, `hostname NAME` renames the machine).
pub struct ArgCountSpec {
    max_args: usize,
}

impl ArgCountSpec {
    pub fn new(max_args: usize) -> Self {
        Self { max_args }
    }
}

impl CommandSpec for ArgCountSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let name = ctx.base_command();
        if ctx.args().len() <= self.max_args {
            Classification::allow(format!("{name} only reads state"))
        } else {
            Classification::ask(format!("{name} with arguments changes state"))
        }
    }
}
