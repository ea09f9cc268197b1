#![allow(dead_code)]

use reactor_commands::{CommandBase, CommandBaseBuilder, Reactor};
use std::io;
use std::thread::{self, JoinHandle};

/// Builds a reactor and a command base, then drives the reactor on its own thread.
pub fn spawn_reactor(builder: CommandBaseBuilder) -> (CommandBase, JoinHandle<io::Result<()>>) {
    let mut reactor = Reactor::new().unwrap();
    let base = builder.build(&mut reactor).unwrap();

    let handle = thread::spawn(move || reactor.run());

    (base, handle)
}

pub fn start() -> (CommandBase, JoinHandle<io::Result<()>>) {
    spawn_reactor(CommandBase::builder())
}

pub fn stop(base: CommandBase, handle: JoinHandle<io::Result<()>>) {
    base.shutdown().unwrap();
    handle.join().unwrap().unwrap();
}
