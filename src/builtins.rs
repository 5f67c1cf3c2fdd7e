//! Demo runtime natives.
//!
//! The bridge treats the script language as an opaque collaborator; this
//! module is the collaborator the workspace ships for its standalone mode
//! and tests. It is deliberately tiny: a line-oriented command script, one
//! command per line.
//!
//! ```text
//! # comment
//! background R G B A
//! line X1 Y1 X2 Y2 R G B A WIDTH
//! frame
//! ```
//!
//! Commands before the first `frame` form frame 0, and so on; trailing
//! commands without a closing `frame` form the last frame. A `background`
//! command applies from the frame it appears in onward.
//!
//! The evaluated program is an environment table:
//! `:frames` — tuple of `(lines-tuple background-tuple)` frame records,
//! `:cursor` — index of the next frame to run,
//! `:background` — the currently visible background color tuple.

use scrawl_engine::{Engine, EngineError, TableKey, Value};

const DEFAULT_BACKGROUND: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

struct Frame {
    lines: Vec<Value>,
    background: [f64; 4],
}

fn color_tuple(c: [f64; 4]) -> Value {
    Value::tuple(c.iter().map(|n| Value::Number(*n)).collect())
}

fn parse_floats<const N: usize>(
    line_no: usize,
    command: &str,
    args: &[&str],
) -> Result<[f64; N], EngineError> {
    if args.len() != N {
        return Err(EngineError::new(format!(
            "line {}: `{}` expects {} arguments, got {}",
            line_no,
            command,
            N,
            args.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, raw) in out.iter_mut().zip(args) {
        *slot = raw.parse::<f64>().map_err(|_| {
            EngineError::new(format!("line {}: `{}` is not a number", line_no, raw))
        })?;
    }
    Ok(out)
}

fn parse_program(source: &str) -> Result<(Vec<Frame>, [f64; 4]), EngineError> {
    let mut frames = Vec::new();
    let mut pending: Vec<Value> = Vec::new();
    let mut background = DEFAULT_BACKGROUND;

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let mut tokens = text.split_whitespace();
        let command = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        match command {
            "background" => {
                background = parse_floats::<4>(line_no, command, &args)?;
            }
            "line" => {
                let v = parse_floats::<9>(line_no, command, &args)?;
                let width = v[8];
                if !width.is_finite() || width < 0.0 {
                    return Err(EngineError::new(format!(
                        "line {}: width must be a non-negative finite number",
                        line_no
                    )));
                }
                pending.push(Value::tuple(vec![
                    Value::tuple(vec![Value::Number(v[0]), Value::Number(v[1])]),
                    Value::tuple(vec![Value::Number(v[2]), Value::Number(v[3])]),
                    color_tuple([v[4], v[5], v[6], v[7]]),
                    Value::Number(width),
                ]));
            }
            "frame" => {
                if !args.is_empty() {
                    return Err(EngineError::new(format!(
                        "line {}: `frame` takes no arguments",
                        line_no
                    )));
                }
                frames.push(Frame {
                    lines: std::mem::take(&mut pending),
                    background,
                });
            }
            other => {
                return Err(EngineError::new(format!(
                    "line {}: unknown command `{}`",
                    line_no, other
                )));
            }
        }
    }
    if !pending.is_empty() {
        frames.push(Frame {
            lines: pending,
            background,
        });
    }
    Ok((frames, background))
}

/// `evaluator/evaluate`: script source → evaluated program table.
pub fn evaluate(engine: &Engine, args: &[Value]) -> Result<Value, EngineError> {
    let source = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::new("evaluate expects a source string"))?;
    let (frames, final_background) = parse_program(source)?;
    let initial_background = frames
        .first()
        .map(|f| f.background)
        .unwrap_or(final_background);

    let heap = engine.heap();
    let mut heap = heap.borrow_mut();
    let frame_records: Vec<Value> = frames
        .into_iter()
        .map(|f| Value::tuple(vec![Value::tuple(f.lines), color_tuple(f.background)]))
        .collect();
    let env = heap.alloc_table();
    heap.table_set(env, TableKey::keyword("frames"), Value::tuple(frame_records));
    heap.table_set(env, TableKey::keyword("cursor"), Value::Number(0.0));
    heap.table_set(
        env,
        TableKey::keyword("background"),
        color_tuple(initial_background),
    );
    Ok(Value::Table(env))
}

/// `runner/run`: advance one frame, return a fresh array of line tuples.
pub fn run(engine: &Engine, args: &[Value]) -> Result<Value, EngineError> {
    let env = args
        .first()
        .and_then(Value::as_table)
        .ok_or_else(|| EngineError::new("run expects an environment table"))?;
    let heap = engine.heap();
    let mut heap = heap.borrow_mut();

    let cursor = heap
        .table_get(env, &TableKey::keyword("cursor"))
        .and_then(|v| v.as_number())
        .ok_or_else(|| EngineError::new("environment has no :cursor"))? as usize;
    let frames_value = heap
        .table_get(env, &TableKey::keyword("frames"))
        .ok_or_else(|| EngineError::new("environment has no :frames"))?;
    let frames = frames_value
        .as_tuple()
        .ok_or_else(|| EngineError::new("environment :frames is not a tuple"))?;

    let mut lines: Vec<Value> = Vec::new();
    if let Some(frame) = frames.get(cursor) {
        let record = frame
            .as_tuple()
            .filter(|r| r.len() == 2)
            .ok_or_else(|| EngineError::new("corrupt frame record"))?;
        lines = record[0]
            .as_tuple()
            .ok_or_else(|| EngineError::new("corrupt frame lines"))?
            .to_vec();
        let frame_background = record[1].clone();
        heap.table_set(env, TableKey::keyword("background"), frame_background);
        heap.table_set(
            env,
            TableKey::keyword("cursor"),
            Value::Number((cursor + 1) as f64),
        );
    }

    let array = heap.alloc_array(lines);
    Ok(Value::Array(array))
}

/// `runner/background`: read the environment's current background color.
pub fn background(engine: &Engine, args: &[Value]) -> Result<Value, EngineError> {
    let env = args
        .first()
        .and_then(Value::as_table)
        .ok_or_else(|| EngineError::new("background expects an environment table"))?;
    let heap = engine.heap();
    let heap = heap.borrow();
    heap.table_get(env, &TableKey::keyword("background"))
        .ok_or_else(|| EngineError::new("environment has no :background"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> (Engine, Value) {
        let engine = Engine::new();
        let env = evaluate(&engine, &[Value::string(source)]).unwrap();
        (engine, env)
    }

    #[test]
    fn test_empty_script_is_a_noop_program() {
        let (engine, env) = eval("");
        let lines = run(&engine, &[env.clone()]).unwrap();
        let heap = engine.heap();
        let heap = heap.borrow();
        match lines {
            Value::Array(r) => assert!(heap.array(r).unwrap().is_empty()),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_single_line_script() {
        let (engine, env) = eval("line 0 0 10 10 1 0 0 1 2");
        let lines = run(&engine, &[env]).unwrap();
        let heap = engine.heap();
        let heap = heap.borrow();
        let items = match lines {
            Value::Array(r) => heap.array(r).unwrap(),
            other => panic!("expected array, got {:?}", other),
        };
        assert_eq!(items.len(), 1);
        let record = items[0].as_tuple().unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(record[3], Value::Number(2.0));
    }

    #[test]
    fn test_unknown_command_fails_evaluation() {
        let engine = Engine::new();
        let err = evaluate(&engine, &[Value::string("twirl 3")]).unwrap_err();
        assert!(err.message().contains("unknown command"));
        assert!(err.message().contains("line 1"));
    }

    #[test]
    fn test_bad_arity_reports_line_number() {
        let engine = Engine::new();
        let err = evaluate(&engine, &[Value::string("\nline 0 0\n")]).unwrap_err();
        assert!(err.message().contains("line 2"));
        assert!(err.message().contains("expects 9 arguments"));
    }

    #[test]
    fn test_negative_width_rejected() {
        let engine = Engine::new();
        let err =
            evaluate(&engine, &[Value::string("line 0 0 1 1 1 1 1 1 -2")]).unwrap_err();
        assert!(err.message().contains("non-negative"));
    }

    #[test]
    fn test_background_changes_apply_per_frame() {
        let source = "background 1 1 1 1\nline 0 0 1 1 1 0 0 1 1\nframe\nbackground 0 0 1 1\nline 1 1 2 2 1 0 0 1 1\n";
        let (engine, env) = eval(source);

        // Initial background comes from frame 0.
        let bg = background(&engine, &[env.clone()]).unwrap();
        assert_eq!(
            bg,
            Value::tuple(vec![
                Value::Number(1.0),
                Value::Number(1.0),
                Value::Number(1.0),
                Value::Number(1.0)
            ])
        );

        run(&engine, &[env.clone()]).unwrap();
        run(&engine, &[env.clone()]).unwrap();
        let bg = background(&engine, &[env]).unwrap();
        assert_eq!(
            bg,
            Value::tuple(vec![
                Value::Number(0.0),
                Value::Number(0.0),
                Value::Number(1.0),
                Value::Number(1.0)
            ])
        );
    }

    #[test]
    fn test_background_read_is_idempotent_without_run() {
        let (engine, env) = eval("background 0.2 0.4 0.6 1\nline 0 0 1 1 1 1 1 1 1");
        let first = background(&engine, &[env.clone()]).unwrap();
        let second = background(&engine, &[env]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_past_last_frame_returns_empty_frames_forever() {
        let (engine, env) = eval("line 0 0 1 1 1 1 1 1 1");
        for pass in 0..4 {
            let lines = run(&engine, &[env.clone()]).unwrap();
            let heap = engine.heap();
            let heap = heap.borrow();
            let count = match lines {
                Value::Array(r) => heap.array(r).unwrap().len(),
                _ => panic!("expected array"),
            };
            if pass == 0 {
                assert_eq!(count, 1);
            } else {
                assert_eq!(count, 0, "pass {} should be empty", pass);
            }
        }
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let (engine, env) = eval("# a comment\n\n   \nline 0 0 1 1 1 1 1 1 1\n");
        let lines = run(&engine, &[env]).unwrap();
        let heap = engine.heap();
        let heap = heap.borrow();
        match lines {
            Value::Array(r) => assert_eq!(heap.array(r).unwrap().len(), 1),
            _ => panic!("expected array"),
        }
    }
}
