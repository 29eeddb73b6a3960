use std::{io, mem::MaybeUninit, os::fd::RawFd};

/// Turn the `-1` error convention of most libc calls into an [`io::Error`] taken from `errno`.
pub fn cerr<Int: Copy + TryInto<libc::c_long>>(res: Int) -> io::Result<Int> {
    match res.try_into() {
        Ok(-1) => Err(io::Error::last_os_error()),
        _ => Ok(res),
    }
}

/// Whether `fd` is a terminal.
///
/// Only character devices are handed to `isatty`, anything else is answered without an ioctl.
pub fn is_terminal(fd: RawFd) -> bool {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } != 0 {
        return false;
    }
    // SAFETY: `fstat` succeeded, so the buffer is filled in.
    let mode = unsafe { stat.assume_init() }.st_mode;
    if mode & libc::S_IFMT != libc::S_IFCHR {
        return false;
    }

    unsafe { libc::isatty(fd) == 1 }
}

#[cfg(test)]
mod test {
    use std::{fs::File, os::fd::AsRawFd, ptr::null_mut};

    use super::{cerr, is_terminal};

    #[test]
    fn cerr_maps_minus_one_to_os_error() {
        assert_eq!(cerr(0).unwrap(), 0);
        assert_eq!(cerr(42i64).unwrap(), 42);

        let err = cerr(unsafe { libc::close(-1) }).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn files_and_devices_are_not_terminals() {
        assert!(!is_terminal(File::open("/bin/sh").unwrap().as_raw_fd()));
        assert!(!is_terminal(File::open("/dev/null").unwrap().as_raw_fd()));
        assert!(!is_terminal(-1));
    }

    #[test]
    fn pseudo_terminals_are_terminals() {
        let (mut leader, mut follower) = (0, 0);
        let res = unsafe {
            libc::openpty(&mut leader, &mut follower, null_mut(), null_mut(), null_mut())
        };
        assert_eq!(res, 0);

        assert!(is_terminal(leader));
        assert!(is_terminal(follower));

        unsafe {
            libc::close(follower);
            libc::close(leader);
        }
    }
}
