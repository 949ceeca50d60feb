use std::{
    env::args_os,
    error::Error,
    fs,
    io::{self, stdin, IsTerminal},
    path::Path,
    process::ExitCode,
};

use klammer::interpreter::Interpreter;
use klammer::value::Value;
use rustyline::validate::MatchingBracketValidator;
use rustyline::{
    error::ReadlineError, Cmd, Completer, ConditionalEventHandler, Editor, Event, EventContext,
    EventHandler, Helper, Highlighter, Hinter, KeyEvent, Movement, RepeatCount, Validator,
};

fn main() -> ExitCode {
    klammer::init_tracing();

    if args_os().len() > 2 {
        eprintln!("usage: klammer [file]");
        return ExitCode::FAILURE;
    }

    let result = match args_os().nth(1) {
        Some(arg) => run_file(Path::new(&arg)),
        None => run_prompt(),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs `code` and reports any error. Returns whether it ran cleanly.
fn run(interpreter: &mut Interpreter, code: &str) -> bool {
    match interpreter.run(code) {
        Ok(_) => true,
        Err(err) => {
            eprintln!("{err}");
            false
        }
    }
}

fn run_file(path: &Path) -> Result<bool, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let mut interpreter = Interpreter::new();
    Ok(run(&mut interpreter, &content))
}

struct TabEventHandler;
impl ConditionalEventHandler for TabEventHandler {
    fn handle(&self, _: &Event, _n: RepeatCount, _: bool, _: &EventContext) -> Option<Cmd> {
        Some(Cmd::Indent(Movement::WholeLine))
    }
}

// Keeps reading lines while brackets are unbalanced.
#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
struct ReplHelper {
    #[rustyline(Completer)]
    completer: (),
    #[rustyline(Validator)]
    validator: MatchingBracketValidator,
}

fn run_prompt() -> Result<bool, Box<dyn Error>> {
    let mut interpreter = Interpreter::new();
    if !stdin().is_terminal() {
        let program = io::read_to_string(stdin().lock())?;
        return Ok(run(&mut interpreter, &program));
    }

    let helper = ReplHelper {
        completer: (),
        validator: MatchingBracketValidator::new(),
    };
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabEventHandler)),
    );

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match interpreter.run(&line) {
                    Ok(Value::Undefined) => {}
                    Ok(value) => println!("{value}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(true),
            Err(err) => return Err(Box::new(err)),
        }
    }
}
