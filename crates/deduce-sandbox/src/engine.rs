use crate::limits::SandboxLimits;
use parking_lot::Mutex;
use rhai::packages::{
    BasicArrayPackage, BasicMapPackage, BasicMathPackage, CorePackage, MoreStringPackage, Package,
};
use rhai::{Dynamic, Engine};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) const ENTRY_POINT: &str = "make_guess";

/// Keywords and functions a snippet can never reach, even past validation.
const DISABLED_SYMBOLS: &[&str] = &[
    "eval",
    "Fn",
    "call",
    "curry",
    "is_def_fn",
    "is_def_var",
    "get_fn_metadata_list",
    "timestamp",
    "elapsed",
    "import",
    "export",
];

/// Host hooks wired into an execution engine.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub cancel: Arc<AtomicBool>,
    pub logs: Arc<Mutex<Vec<String>>>,
}

/// A locked-down interpreter: the standard library without the time package,
/// no module resolver, bounded recursion and data sizes.
pub(crate) fn build_engine(limits: &SandboxLimits, hooks: Option<&Hooks>) -> Engine {
    let mut engine = Engine::new_raw();
    engine.register_global_module(CorePackage::new().as_shared_module());
    engine.register_global_module(BasicMathPackage::new().as_shared_module());
    engine.register_global_module(BasicArrayPackage::new().as_shared_module());
    engine.register_global_module(BasicMapPackage::new().as_shared_module());
    engine.register_global_module(MoreStringPackage::new().as_shared_module());
    for symbol in DISABLED_SYMBOLS {
        engine.disable_symbol(*symbol);
    }
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_array_size);

    if let Some(hooks) = hooks {
        let cancel = Arc::clone(&hooks.cancel);
        engine.on_progress(move |_| {
            if cancel.load(Ordering::Relaxed) {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });
        let printed = Arc::clone(&hooks.logs);
        engine.on_print(move |line| printed.lock().push(line.to_string()));
        let debugged = Arc::clone(&hooks.logs);
        engine.on_debug(move |line, _, pos| debugged.lock().push(format!("[debug {pos}] {line}")));
    }
    engine
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        build_engine(&SandboxLimits::default(), None)
    }

    #[test]
    fn clock_functions_are_unavailable() {
        assert!(engine().eval::<Dynamic>("timestamp()").is_err());
        assert!(engine().eval::<Dynamic>("let t = timestamp(); t.elapsed").is_err());
    }

    #[test]
    fn eval_does_not_compile() {
        assert!(engine().compile("eval(\"1 + 1\")").is_err());
    }

    #[test]
    fn snippet_library_is_still_present() {
        let value = engine()
            .eval::<rhai::Array>(
                "let picks = [3, 1]; picks.push(2); picks.sort(); \
                 let m = #{ a: picks.len() }; if picks.contains(2) { picks + [m.a % 2] } else { [] }",
            )
            .unwrap();
        let picks: Vec<i64> = value.into_iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(picks, vec![1, 2, 3, 1]);
    }
}
