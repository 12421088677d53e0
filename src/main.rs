use asm8080::cli::command;
use structopt::StructOpt;

fn main() {
    env_logger::init();
    command::terminal_init();
    command::asm(command::CommandAsm::from_args());
}
