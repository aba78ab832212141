use super::CommandSpec;
use crate::eval::{Classification, CommandContext};

/// `tee FILE...` copies stdin to each file. The files are reported as writes
/// and resolved through the redirect rules.
pub struct TeeSpec;

impl CommandSpec for TeeSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let mut targets = Vec::new();
        let mut args = ctx.args().iter();
        while let Some(arg) = args.next() {
            if arg == "--" {
                targets.extend(args.by_ref().cloned());
                break;
            }
            if !arg.starts_with('-') {
                targets.push(arg.clone());
            }
        }
        match targets.as_slice() {
            [] => Classification::allow("tee to stdout"),
            [one] => Classification::allow(format!("tee {one}")).with_writes(targets.clone()),
            many => Classification::allow(format!("tee {} files", many.len()))
                .with_writes(targets.clone()),
        }
    }
}
