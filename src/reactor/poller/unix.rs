use libc::{EFD_CLOEXEC, EFD_NONBLOCK, EFD_SEMAPHORE, eventfd, read, write};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

/// Size of one counter transfer on an `eventfd`.
///
/// Reads and writes of exactly this size are atomic; anything shorter
/// is treated as a fault.
pub(crate) const COUNTER_SIZE: usize = mem::size_of::<u64>();

/// Creates a non-blocking `eventfd` in semaphore mode.
///
/// Each read decrements the counter by one, so the descriptor stays
/// readable for as long as increments remain unconsumed.
pub(crate) fn sys_eventfd_semaphore() -> io::Result<OwnedFd> {
    let fd = unsafe { eventfd(0, EFD_SEMAPHORE | EFD_NONBLOCK | EFD_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Adds `value` to an `eventfd` counter.
pub(crate) fn sys_write_counter(fd: &OwnedFd, value: u64) -> io::Result<()> {
    let buf = value.to_ne_bytes();
    let n = unsafe { write(fd.as_raw_fd(), buf.as_ptr() as *const _, COUNTER_SIZE) };

    check_transfer(n)
}

/// Consumes one unit from a semaphore-mode `eventfd`.
pub(crate) fn sys_read_counter(fd: &OwnedFd) -> io::Result<u64> {
    let mut buf = [0u8; COUNTER_SIZE];
    let n = unsafe { read(fd.as_raw_fd(), buf.as_mut_ptr() as *mut _, COUNTER_SIZE) };

    check_transfer(n)?;
    Ok(u64::from_ne_bytes(buf))
}

fn check_transfer(n: isize) -> io::Result<()> {
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    if n as usize != COUNTER_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {COUNTER_SIZE} bytes, transferred {n}"),
        ));
    }

    Ok(())
}

