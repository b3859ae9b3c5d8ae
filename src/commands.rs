use crate::{
    console::QueryDefault,
    editor::edit_lines,
    interrupt,
    registry::{Argument, CommandContext, CommandSpec, Flow, Verb},
    tool_overrides::Tool,
};

pub fn standard_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "add",
            usage: "add",
            help: "Add a global, probe, or function.",
            argument: Argument::ScriptText,
            handler: add,
        },
        CommandSpec {
            name: "delete",
            usage: "delete LINE_NUM",
            help: "Delete a script line by its number.",
            argument: Argument::LineNumber,
            handler: delete,
        },
        CommandSpec {
            name: "list",
            usage: "list",
            help: "Display the current script.",
            argument: Argument::None,
            handler: list,
        },
        CommandSpec {
            name: "edit",
            usage: "edit",
            help: "Edit the current script. Uses EDITOR environment variable contents as editor (or ex as default).",
            argument: Argument::None,
            handler: edit,
        },
        CommandSpec {
            name: "load",
            usage: "load FILE",
            help: "Load a script from a file into the current session.",
            argument: Argument::File,
            handler: load,
        },
        CommandSpec {
            name: "save",
            usage: "save FILE",
            help: "Save a script to a file from the current session.",
            argument: Argument::File,
            handler: save,
        },
        CommandSpec {
            name: "run",
            usage: "run",
            help: "Run the current script.",
            argument: Argument::None,
            handler: run,
        },
        CommandSpec {
            name: "set",
            usage: "set OPTION VALUE",
            help: "Set option value. Supported options are:",
            argument: Argument::Option(Verb::Set),
            handler: set,
        },
        CommandSpec {
            name: "show",
            usage: "show OPTION",
            help: "Show option value.",
            argument: Argument::Option(Verb::Show),
            handler: show,
        },
        CommandSpec {
            name: "help",
            usage: "help",
            help: "Print this command list.",
            argument: Argument::None,
            handler: help,
        },
        CommandSpec {
            name: "quit",
            usage: "quit",
            help: "Quit the shell.",
            argument: Argument::None,
            handler: quit,
        },
    ]
}

fn print_usage(ctx: &mut CommandContext<'_>) {
    let text = ctx.registry.help_text();
    ctx.console.print(text.trim_end());
}

fn invalid(ctx: &mut CommandContext<'_>, message: &str) {
    ctx.console.print("");
    ctx.console.print(message);
    print_usage(ctx);
}

fn help(ctx: &mut CommandContext<'_>, _tokens: &[String]) -> Flow {
    print_usage(ctx);
    Flow::Continue
}

fn list(ctx: &mut CommandContext<'_>, _tokens: &[String]) -> Flow {
    for line in ctx.state.script.listing() {
        ctx.console.print(&line);
    }
    Flow::Continue
}

fn quit(_ctx: &mut CommandContext<'_>, _tokens: &[String]) -> Flow {
    Flow::Quit
}

// Re-joining tokens collapses runs of spaces inside string literals.
fn add(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    ctx.state.script.push(tokens[1..].join(" "));
    Flow::Continue
}

fn delete(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    match tokens.len() {
        1 => {
            if ctx
                .console
                .query("Delete entire script? ", QueryDefault::NoDefault)
            {
                ctx.state.script.clear();
            }
        }
        2 => match tokens[1].parse::<usize>() {
            Err(_) => ctx.console.print("Invalid script line value"),
            Ok(number) => {
                if ctx.state.script.remove(number).is_none() {
                    ctx.console.print(&format!("No line {number}."));
                }
            }
        },
        _ => invalid(ctx, "Invalid command"),
    }
    Flow::Continue
}

fn load(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    if tokens.len() != 2 {
        invalid(ctx, "FILE must be specified.");
        return Flow::Continue;
    }
    match ctx.state.script.load_file(&tokens[1]) {
        Ok(count) => tracing::debug!(path = %tokens[1], count, "loaded script lines"),
        Err(e) => {
            ctx.console.print("");
            ctx.console.print(&e.to_string());
        }
    }
    Flow::Continue
}

fn save(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    if tokens.len() != 2 {
        invalid(ctx, "FILE must be specified.");
        return Flow::Continue;
    }
    if let Err(e) = ctx.state.script.save_file(&tokens[1]) {
        ctx.console.print("");
        ctx.console.print(&e.to_string());
    }
    Flow::Continue
}

fn edit(ctx: &mut CommandContext<'_>, _tokens: &[String]) -> Flow {
    let editor = Tool::Editor.resolve();
    match edit_lines(ctx.state.script.lines(), &editor) {
        Ok(lines) => ctx.state.script.replace(lines),
        Err(e) => {
            ctx.console.print("");
            ctx.console.print(&e.to_string());
        }
    }
    Flow::Continue
}

fn run(ctx: &mut CommandContext<'_>, _tokens: &[String]) -> Flow {
    if ctx.state.script.is_empty() {
        ctx.console.note("No script specified.");
        return Flow::Continue;
    }
    let script = ctx.state.script.text();
    ctx.state.session.set_script(script);
    interrupt::clear();

    let result = match ctx.runner.compile(&ctx.state.session) {
        Ok(result) => result,
        Err(e) => {
            ctx.console.note(&e.to_string());
            return Flow::Continue;
        }
    };
    if !result.succeeded() {
        ctx.console
            .note(&format!("Pass 1-4 failed with status {}.", result.exit_code));
        return Flow::Continue;
    }
    if ctx.state.session.last_pass < 5 || interrupt::pending() {
        return Flow::Continue;
    }
    let Some(artifacts) = result.artifacts else {
        return Flow::Continue;
    };
    match ctx
        .runner
        .deploy(&ctx.state.session, &artifacts, &ctx.state.targets)
    {
        Ok(0) => {}
        Ok(code) => ctx
            .console
            .note(&format!("Pass 5 exited with status {code}.")),
        Err(e) => ctx.console.note(&e.to_string()),
    }
    Flow::Continue
}

fn set(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    if tokens.len() < 3 {
        invalid(ctx, "Invalid command");
        return Flow::Continue;
    }
    apply_option(ctx, Verb::Set, tokens);
    Flow::Continue
}

fn show(ctx: &mut CommandContext<'_>, tokens: &[String]) -> Flow {
    match tokens.len() {
        1 => {
            let registry = ctx.registry;
            for option in registry.options() {
                option.apply(&mut ctx.state.session, &mut *ctx.console, Verb::Show, tokens);
            }
        }
        2 => apply_option(ctx, Verb::Show, tokens),
        _ => invalid(ctx, "Invalid command"),
    }
    Flow::Continue
}

fn apply_option(ctx: &mut CommandContext<'_>, verb: Verb, tokens: &[String]) {
    let registry = ctx.registry;
    match registry.option(&tokens[1]) {
        Some(option) => option.apply(&mut ctx.state.session, &mut *ctx.console, verb, tokens),
        None => {
            ctx.console.print("Invalid option name");
            print_usage(ctx);
        }
    }
}
