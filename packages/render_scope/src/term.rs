use anyhow::Result;
#[cfg(unix)]
use nix::libc;

/// Current terminal size as (width, height) surface units.
#[cfg(unix)]
pub fn surface_size() -> Result<(u32, u32)> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let ret = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if ret == -1 {
        anyhow::bail!("ioctl TIOCGWINSZ failed");
    }
    Ok((ws.ws_col as u32, ws.ws_row as u32))
}

#[cfg(not(unix))]
pub fn surface_size() -> Result<(u32, u32)> {
    Ok((80, 24))
}
