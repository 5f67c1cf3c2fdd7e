//! End-to-end bridge tests over the demo runtime: compile, image load,
//! frame stepping, lifecycle, and failure reporting.

use scrawl::bootstrap::{self, fresh_bridge};
use scrawl::{Bridge, BridgeError};
use scrawl_bridge::{image, ImageDictionary, ENTRY_BACKGROUND, ENTRY_EVALUATE, ENTRY_RUN};
use scrawl_engine::{Engine, EngineError, TableKey, Value};
use scrawl_types::Color;

mod compile_tests {
    use super::*;

    #[test]
    fn test_compile_then_start_yields_background() {
        let bridge = fresh_bridge().unwrap();
        let image = bridge
            .compile("background 0.5 0.5 0.5 1\nline 0 0 1 1 1 1 1 1 1")
            .unwrap();
        let started = bridge.start(&image).unwrap();
        assert_eq!(started.background, Color::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn test_empty_script_compiles_and_runs() {
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile("").unwrap();
        assert!(!image.is_empty());
        let started = bridge.start(&image).unwrap();
        let frame = bridge.step(&started.environment).unwrap();
        assert!(frame.lines.is_empty());
        // Background stays the runtime default.
        assert_eq!(frame.background, Color::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_compile_error_is_reported_not_fatal() {
        let bridge = fresh_bridge().unwrap();
        let err = bridge.compile("spiral 40").unwrap_err();
        assert!(err.to_string().starts_with("evaluation error:"));
        assert!(err.to_string().contains("unknown command"));

        // The bridge stays usable after a failed compile.
        assert!(bridge.compile("").is_ok());
    }

    #[test]
    fn test_digest_is_stable_for_identical_source() {
        let bridge = fresh_bridge().unwrap();
        let a = bridge.compile("line 0 0 1 1 1 0 0 1 2").unwrap();
        let b = bridge.compile("line 0 0 1 1 1 0 0 1 2").unwrap();
        assert_eq!(a.digest_hex(), b.digest_hex());
        assert_eq!(a.bytes(), b.bytes());
    }
}

mod step_tests {
    use super::*;

    #[test]
    fn test_single_red_line_frame() {
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile("line 0 0 10 10 1 0 0 1 2").unwrap();
        let started = bridge.start(&image).unwrap();
        let frame = bridge.step(&started.environment).unwrap();

        assert_eq!(frame.lines.len(), 1);
        let line = frame.lines[0];
        assert_eq!(line.start.x, 0.0);
        assert_eq!(line.start.y, 0.0);
        assert_eq!(line.end.x, 10.0);
        assert_eq!(line.end.y, 10.0);
        assert_eq!(line.color, Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(line.width, 2.0);
    }

    #[test]
    fn test_frames_drain_then_stay_empty() {
        let source = "line 0 0 1 1 1 1 1 1 1\nframe\nline 1 1 2 2 1 1 1 1 1\n";
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile(source).unwrap();
        let started = bridge.start(&image).unwrap();

        for expected in [1usize, 1, 0, 0, 0] {
            let frame = bridge.step(&started.environment).unwrap();
            assert_eq!(frame.lines.len(), expected);
        }
    }

    #[test]
    fn test_background_read_after_run_mutates_environment() {
        // Frame 1 changes the background; the step that produces frame 1's
        // lines must already report the new color.
        let source = "line 0 0 1 1 1 1 1 1 1\nframe\nbackground 0 0 1 1\nline 1 1 2 2 1 1 1 1 1\n";
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile(source).unwrap();
        let started = bridge.start(&image).unwrap();
        assert_eq!(started.background, Color::new(0.0, 0.0, 0.0, 1.0));

        let first = bridge.step(&started.environment).unwrap();
        assert_eq!(first.background, Color::new(0.0, 0.0, 0.0, 1.0));
        let second = bridge.step(&started.environment).unwrap();
        assert_eq!(second.background, Color::new(0.0, 0.0, 1.0, 1.0));
        // Past the last frame the background is stable.
        let third = bridge.step(&started.environment).unwrap();
        assert_eq!(third.background, second.background);
    }

    #[test]
    fn test_one_image_seeds_independent_environments() {
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile("line 0 0 1 1 1 1 1 1 1").unwrap();

        let a = bridge.start(&image).unwrap();
        let b = bridge.start(&image).unwrap();

        // Draining one environment leaves the other untouched.
        assert_eq!(bridge.step(&a.environment).unwrap().lines.len(), 1);
        assert_eq!(bridge.step(&a.environment).unwrap().lines.len(), 0);
        assert_eq!(bridge.step(&b.environment).unwrap().lines.len(), 1);
    }

    #[test]
    fn test_image_survives_collection_between_operations() {
        let bridge = fresh_bridge().unwrap();
        let image = bridge.compile("line 0 0 1 1 1 1 1 1 1").unwrap();
        bridge.engine().collect();
        let started = bridge.start(&image).unwrap();
        bridge.engine().collect();
        let frame = bridge.step(&started.environment).unwrap();
        assert_eq!(frame.lines.len(), 1);

        // Dropping the handles releases their pins.
        let live_before = bridge.engine().heap().borrow().live_count();
        drop(started);
        drop(image);
        bridge.engine().collect();
        let live_after = bridge.engine().heap().borrow().live_count();
        assert!(live_after < live_before);
    }
}

mod fake_runtime_tests {
    use super::*;

    /// Bootstrap a bridge whose runner always signals a failure.
    fn failing_runner_bridge() -> Bridge {
        let engine = Engine::new();
        let evaluate = engine.register(ENTRY_EVALUATE, |engine: &Engine, _args: &[Value]| {
            let heap = engine.heap();
            let env = heap.borrow_mut().alloc_table();
            Ok(Value::Table(env))
        });
        let run = engine.register(ENTRY_RUN, |_: &Engine, _: &[Value]| {
            Err(EngineError::new("runner exploded"))
        });
        let background = engine.register(ENTRY_BACKGROUND, |_: &Engine, _: &[Value]| {
            Ok(Value::tuple(vec![
                Value::Number(0.0),
                Value::Number(0.0),
                Value::Number(0.0),
                Value::Number(1.0),
            ]))
        });

        let mut dict = ImageDictionary::new();
        dict.register(ENTRY_EVALUATE, evaluate);
        dict.register(ENTRY_RUN, run);
        dict.register(ENTRY_BACKGROUND, background);

        let heap = engine.heap();
        let bytes = {
            let mut h = heap.borrow_mut();
            let env = h.alloc_table();
            for (name, id) in [
                (ENTRY_EVALUATE, evaluate),
                (ENTRY_RUN, run),
                (ENTRY_BACKGROUND, background),
            ] {
                let entry = h.alloc_table();
                h.table_set(entry, TableKey::keyword("value"), Value::Function(id));
                h.table_set(env, TableKey::str(name), Value::Table(entry));
            }
            let env = Value::Table(env);
            drop(h);
            let h = heap.borrow();
            image::serialize(&h, &env, &dict).unwrap()
        };
        Bridge::bootstrap(engine, dict, &bytes).unwrap()
    }

    #[test]
    fn test_runner_signal_surfaces_as_evaluation_error() {
        let bridge = failing_runner_bridge();
        let image = bridge.compile("anything").unwrap();
        let started = bridge.start(&image).unwrap();
        let err = bridge.step(&started.environment).unwrap_err();
        assert!(err.to_string().starts_with("evaluation error:"));
        assert!(err.to_string().contains("runner exploded"));
    }

    #[test]
    fn test_uninitialized_bridge_fails_every_operation() {
        let bridge = Bridge::new(Engine::new(), ImageDictionary::new());
        let err = bridge.compile("").unwrap_err();
        assert!(matches!(err, BridgeError::Uninitialized { .. }));
        assert!(err.to_string().contains(ENTRY_EVALUATE));
    }

    #[test]
    fn test_runner_returning_non_array_is_a_decode_error() {
        let engine = Engine::new();
        let evaluate = engine.register(ENTRY_EVALUATE, |engine: &Engine, _: &[Value]| {
            let heap = engine.heap();
            let env = heap.borrow_mut().alloc_table();
            Ok(Value::Table(env))
        });
        let run = engine.register(ENTRY_RUN, |_: &Engine, _: &[Value]| {
            Ok(Value::string("not lines"))
        });
        let background = engine.register(ENTRY_BACKGROUND, |_: &Engine, _: &[Value]| {
            Ok(Value::tuple(vec![
                Value::Number(0.0),
                Value::Number(0.0),
                Value::Number(0.0),
                Value::Number(1.0),
            ]))
        });
        let mut dict = ImageDictionary::new();
        dict.register(ENTRY_EVALUATE, evaluate);
        dict.register(ENTRY_RUN, run);
        dict.register(ENTRY_BACKGROUND, background);

        let heap = engine.heap();
        let bytes = {
            let mut h = heap.borrow_mut();
            let env = h.alloc_table();
            for (name, id) in [
                (ENTRY_EVALUATE, evaluate),
                (ENTRY_RUN, run),
                (ENTRY_BACKGROUND, background),
            ] {
                let entry = h.alloc_table();
                h.table_set(entry, TableKey::keyword("value"), Value::Function(id));
                h.table_set(env, TableKey::str(name), Value::Table(entry));
            }
            let env = Value::Table(env);
            drop(h);
            let h = heap.borrow();
            image::serialize(&h, &env, &dict).unwrap()
        };
        let bridge = Bridge::bootstrap(engine, dict, &bytes).unwrap();

        let image = bridge.compile("anything").unwrap();
        let started = bridge.start(&image).unwrap();
        let err = bridge.step(&started.environment).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
    }
}

mod bootstrap_tests {
    use super::*;

    #[test]
    fn test_image_written_by_one_engine_loads_in_another() {
        let writer = Engine::new();
        let runtime = bootstrap::install_builtins(&writer);
        let bytes = bootstrap::build_bootstrap_image(&writer, &runtime).unwrap();

        let bridge = bootstrap::bridge_from_image(&bytes).unwrap();
        let image = bridge.compile("line 0 0 10 10 1 0 0 1 2").unwrap();
        let started = bridge.start(&image).unwrap();
        let frame = bridge.step(&started.environment).unwrap();
        assert_eq!(frame.lines.len(), 1);
    }

    #[test]
    fn test_truncated_bootstrap_image_rejected() {
        let writer = Engine::new();
        let runtime = bootstrap::install_builtins(&writer);
        let bytes = bootstrap::build_bootstrap_image(&writer, &runtime).unwrap();

        let err = bootstrap::bridge_from_image(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, BridgeError::Format { .. }));
    }
}
