use super::*;
use crate::compile::{finish, Output};
use crate::parse::Module;
use crate::source::Source;

fn no_check(_: &Module, _: &mut Context) {}

/// Compile `text` up to `last_step`, returning the rendered output (or the
/// error) followed by the rendered messages.
fn run(text: &str, last_step: PassStep) -> String {
    let config = Config {
        last_step,
        ..Config::default()
    };
    let mut ctx = Context::new(Source::new("test", text), config);
    let output = match run_compiler(&mut ctx, &mut no_check) {
        Ok(output) => output.render(&ctx.source),
        Err(error) => format!("{error}\n"),
    };
    output + &finish(&mut ctx)
}

#[track_caller]
fn assert_text(expected: &str, actual: &str) {
    if actual == expected {
        return;
    }
    println!("changes in output:");
    for (line, diff) in diff::lines(expected, actual).iter().enumerate() {
        match diff {
            diff::Result::Left(l) => {
                println!("{line:>2}: -{l}");
            }
            diff::Result::Both(l, _) => {
                println!("{line:>2}:  {l}");
            }
            diff::Result::Right(r) => {
                println!("{line:>2}: +{r}");
            }
        }
    }
    panic!("changed output");
}

#[test]
fn tokens() {
    assert_text(
        "Symbol @ 1:1 \"f\"\n\
         OpenParen @ 1:2 \"(\"\n\
         Symbol @ 1:3 \"x\"\n\
         CloseParen @ 1:4 \")\"\n",
        &run("f(x)", PassStep::Lex),
    );
}

#[test]
fn tree() {
    assert_text(
        "SemiColon @ 1:1-2:1 (0-9) {\n\
         \x20 Declaration @ 1:3-1:4 (2-3) \"=\" {\n\
         \x20   Symbol @ 1:1-1:2 (0-1) \"a\"\n\
         \x20   Symbol @ 1:5-1:6 (4-5) \"f\" {\n\
         \x20     NumberLiteral @ 1:7-1:8 (6-7) \"1\"\n\
         \x20   }\n\
         \x20 }\n\
         }\n",
        &run("a = f(1)\n", PassStep::Parse),
    );
}

#[test]
fn module() {
    let text = "// gates\n\
                nand(a, b) = sequence(And(a, b, c), Free(a))\n\
                x = [1, 2] ++ [3]; y = -x.len\n";
    assert_text(
        "nand(a, b) = sequence(And(a, b, c), Free(a))\n\
         x = ([1, 2] ++ [3])\n\
         y = (-(x . len))\n",
        &run(text, PassStep::Check),
    );
}

#[test]
fn final_step_prints_module() {
    let config = Config::default();
    let mut ctx = Context::new(Source::new("test", "a = 1"), config);
    let output = run_compiler(&mut ctx, &mut no_check);
    assert!(matches!(output, Ok(Output::Module(ref module)) if module.definitions.len() == 1));
    assert_eq!(ctx.step(), PassStep::Final);
}

#[test]
fn unclosed_paren() {
    assert_text(
        "compilation halted during Parse with 1 error(s)\n\
         test:1:5: error: Unclosed '('\n\
         \x20  1 | a = (1,\n\
         \x20    |     ^\n",
        &run("a = (1,\nb = 2", PassStep::Final),
    );
}

#[test]
fn unterminated_strings() {
    assert_text(
        "compilation halted during Lex with 1 error(s)\n\
         test:1:1: warning: Unterminated string literal (or maybe you wanted a \"multiline string\"?)\n\
         \x20  1 | '123\n\
         \x20    | ^^^^\n\
         test:2:1: error: Unterminated string literal, found end of file.\n\
         \x20  2 | 'foo\n\
         \x20    | ^^^^\n",
        &run("'123\n'foo", PassStep::Final),
    );
}

#[test]
fn parameter_errors_are_all_reported() {
    assert_text(
        "compilation halted during Parse with 2 error(s)\n\
         test:1:3: error: Expected a parameter name\n\
         \x20  1 | f(1) = 1\n\
         \x20    |   ^\n\
         test:2:6: error: Duplicate parameter 'a'\n\
         \x20  2 | g(a, a) = a\n\
         \x20    |      ^\n",
        &run("f(1) = 1\ng(a, a) = a\n", PassStep::Final),
    );
}

#[test]
fn tree_errors_stop_before_parsing() {
    assert_text(
        "compilation halted during Parse with 1 error(s)\n\
         test:1:1: error: Expected a definition\n\
         \x20  1 | 1 = 2\n\
         \x20    | ^^^^^\n",
        &run("1 = 2\nf(1) = 1\n", PassStep::Final),
    );
}

#[test]
fn files_keep_their_ids() {
    let sources = ["a = 1", "b = é"];
    for (index, text) in sources.into_iter().enumerate() {
        let file = source::FileId(index as u32);
        let source = Source::new(format!("file{index}"), text).with_id(file);
        let mut ctx = Context::new(source, Config::default());
        let _ = run_compiler(&mut ctx, &mut no_check);
        assert!(ctx.messages.iter().all(|m| m.location.file == file));
    }
}

#[test]
fn deep_nesting_halts_cleanly() {
    let n = 5_000;
    let text = "a = ".to_string() + &"(".repeat(n) + "a" + &")".repeat(n);
    let output = run(&text, PassStep::Final);
    let mut lines = output.lines();
    assert_eq!(
        lines.next(),
        Some("compilation halted during Parse with 1 error(s)")
    );
    assert_eq!(
        lines.next(),
        Some("test:1:260: error: Expression nesting is too deep (maximum 256 levels)")
    );
}
