//! End-to-end scripts run against the recording host.

use ctlscript::dispatch::Dispatcher;
use ctlscript::effector::Recorder;
use ctlscript::script::{Interpreter, Limits};

fn run(src: &str) -> (Interpreter, Recorder) {
    let mut interp = Interpreter::new();
    let mut rec = Recorder::new();
    interp.exec_script(src, &mut rec);
    (interp, rec)
}

/// Store `src` line by line, then run it from the compressed buffer.
fn run_stored(src: &str) -> (Interpreter, Recorder) {
    let mut interp = Interpreter::new();
    let mut rec = Recorder::new();
    for line in src.lines() {
        interp.store_line(line).unwrap();
    }
    interp.run_buffer(&mut rec);
    (interp, rec)
}

// ── Direct execution ──────────────────────────────────────────────────────────

#[test]
fn assignment_then_arithmetic() {
    let (interp, rec) = run("x = 10\ny = x + 5");
    assert_eq!(interp.get_var("y"), 15.0);
    assert_eq!(rec.output.last().map(String::as_str), Some("y = 15.00"));
}

#[test]
fn precedence_and_right_grouping() {
    let (interp, _) = run("a = 2 + 3 * 4\nb = 10 - 4 - 3\nc = 8 / 2 / 2\nd = -3 + 5\ne = 2 - 1 + 1");
    assert_eq!(interp.get_var("a"), 14.0);
    assert_eq!(interp.get_var("b"), 9.0);
    assert_eq!(interp.get_var("c"), 8.0);
    assert_eq!(interp.get_var("d"), 2.0);
    assert_eq!(interp.get_var("e"), 0.0);
}

#[test]
fn division_by_zero_is_zero() {
    let (interp, _) = run("z = 0\nq = 5 / z");
    assert_eq!(interp.get_var("q"), 0.0);
}

#[test]
fn for_sum() {
    let (interp, _) = run_stored("s = 0\nfor i = 1, 3 do\n  s = s + i\nend");
    assert_eq!(interp.get_var("s"), 6.0);
}

#[test]
fn for_runs_exactly_in_order() {
    let (_, rec) = run("for i = 1, 5 do\ndigitalWrite(i, 1)\nend");
    assert_eq!(
        rec.calls,
        vec![
            "digitalWrite(1, 1)",
            "digitalWrite(2, 1)",
            "digitalWrite(3, 1)",
            "digitalWrite(4, 1)",
            "digitalWrite(5, 1)",
        ]
    );
}

#[test]
fn while_stops_at_iteration_cap() {
    let (interp, _) = run("n = 0\nwhile n >= 0 do\nn = n + 1\nend\nprint(after)");
    assert_eq!(interp.get_var("n"), 1000.0);
}

#[test]
fn nested_if_else_inside_loop() {
    let src = "\
evens = 0
odds = 0
for i = 1, 6 do
  if i > 0 then
    if i == 2 then
      evens = evens + 1
    elseif i == 4 then
      evens = evens + 1
    elseif i == 6 then
      evens = evens + 1
    else
      odds = odds + 1
    end
  end
end";
    let (interp, _) = run_stored(src);
    assert_eq!(interp.get_var("evens"), 3.0);
    assert_eq!(interp.get_var("odds"), 3.0);
}

#[test]
fn false_inner_if_keeps_outer_remainder() {
    let src = "\
a = 0
b = 0
c = 0
d = 0
if 1 then
  b = 1
  if 0 then
    a = 1
  end
  c = 1
end
d = 1";
    for (interp, _) in [run(src), run_stored(src)] {
        let got: Vec<f32> = ["a", "b", "c", "d"].iter().map(|n| interp.get_var(n)).collect();
        assert_eq!(got, [0.0, 1.0, 1.0, 1.0]);
    }
}

#[test]
fn float_equality_uses_tolerance() {
    let (_, rec) = run("x = 0.1 + 0.2\nif x == 0.3 then\nprint(close)\nend");
    assert_eq!(rec.output[1..], ["close"]);
}

#[test]
fn capacity_exceeded_keeps_running() {
    let limits = Limits { max_vars: 2, ..Limits::default() };
    let mut interp = Interpreter::with_limits(limits);
    let mut rec = Recorder::new();
    interp.exec_script("a = 1\nb = 2\nc = 3\na = a + b\nprint(done)", &mut rec);
    assert!(rec.output[2].starts_with("ERR: "), "{:?}", rec.output);
    assert_eq!(interp.get_var("a"), 3.0);
    assert_eq!(interp.get_var("c"), 0.0);
    assert_eq!(rec.output.last().map(String::as_str), Some("done"));
}

#[test]
fn long_names_share_a_slot() {
    let (interp, _) = run("abcdefghijklmnopXYZ = 1\nabcdefghijklmnopQRS = 2");
    assert_eq!(interp.vars().len(), 1);
    assert_eq!(interp.get_var("abcdefghijklmno"), 2.0);
}

#[test]
fn blink_drives_host() {
    let src = "\
led = 13
pinMode(led, 1)
for k = 1, 2 do
  digitalWrite(led, 1)
  delay(250)
  digitalWrite(led, 0)
  delay(250)
end
t = millis()";
    let (interp, rec) = run_stored(src);
    assert_eq!(interp.get_var("t"), 1000.0);
    assert_eq!(rec.calls.first().map(String::as_str), Some("pinMode(13, 1)"));
    assert_eq!(rec.calls.iter().filter(|c| c.starts_with("delay")).count(), 4);
}

#[test]
fn serial_echo_with_input_queue() {
    let mut interp = Interpreter::new();
    let mut rec = Recorder::new();
    rec.input.extend(b"AB");
    interp.exec_script("while available() > 0 do\nc = read()\nend", &mut rec);
    // Conditions are plain arithmetic: `available()` there is not a call
    // and evaluates to 0, so the loop never runs.
    assert_eq!(interp.get_var("c"), 0.0);

    interp.exec_script("n = available()\nwhile n > 0 do\nc = read()\nn = available()\nend", &mut rec);
    assert_eq!(interp.get_var("c"), f32::from(b'B'));
    assert_eq!(interp.get_var("n"), 0.0);
}

#[test]
fn comments_and_blank_lines_are_dropped() {
    let (interp, rec) = run_stored("# header\n\nx = 1 # one\n   \nprint(\"# not a comment\")");
    assert_eq!(interp.buffer().line_count(), 2);
    assert_eq!(rec.output, vec!["x = 1.00", "# not a comment"]);
}

#[test]
fn malformed_blocks_degrade() {
    let (_, rec) = run("if x > 0\nprint(ran)\nend\nfor i = 1 do\nprint(also)");
    assert!(rec.output.contains(&"ran".to_owned()));
    assert!(rec.output.contains(&"also".to_owned()));
}

// ── Buffer ────────────────────────────────────────────────────────────────────

#[test]
fn buffer_round_trip_preserves_lines() {
    let src = "for i = 1, 10, 2 do\nif i > 4 then\nanalogWrite(3, i * 10)\nend\nend";
    let mut interp = Interpreter::new();
    for line in src.lines() {
        interp.store_line(line).unwrap();
    }
    assert_eq!(interp.buffer().lines(), src.lines().collect::<Vec<_>>());
    assert!(interp.buffer().used() < src.len());
}

#[test]
fn buffer_full_rejects_whole_line() {
    let limits = Limits { buffer_size: 10, ..Limits::default() };
    let mut interp = Interpreter::with_limits(limits);
    interp.store_line("x = 1").unwrap();
    let used = interp.buffer().used();
    assert!(interp.store_line("y = 22222").is_err());
    assert_eq!(interp.buffer().used(), used);
    assert_eq!(interp.buffer().line_count(), 1);
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

#[test]
fn dispatcher_session() {
    let mut d = Dispatcher::default();
    let mut rec = Recorder::new();
    for line in ["begin", "x = x + 1", "done", "run", "run", "x"] {
        d.handle_line(line, &mut rec);
    }
    assert_eq!(d.interpreter().get_var("x"), 2.0);
    assert_eq!(rec.output.last().map(String::as_str), Some("2.00"));
}
