use multibox_config::CLOSE_REPEAT_DELAY;
use tracing::{info, warn};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsIconic, IsWindowVisible, PostMessageW,
    SetForegroundWindow, ShowWindow, SW_RESTORE, WM_CLOSE,
};

use super::{FocusOutcome, WindowError, WindowManager};

pub struct Win32WindowManager;

unsafe extern "system" fn collect_visible(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<(HWND, String)>);
    if IsWindowVisible(hwnd).as_bool() {
        let len = GetWindowTextLengthW(hwnd);
        if len > 0 {
            let mut buf = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buf);
            if copied > 0 {
                found.push((hwnd, String::from_utf16_lossy(&buf[..copied as usize])));
            }
        }
    }
    BOOL(1)
}

fn visible_windows() -> Result<Vec<(HWND, String)>, WindowError> {
    let mut found: Vec<(HWND, String)> = Vec::new();
    unsafe { EnumWindows(Some(collect_visible), LPARAM(&mut found as *mut _ as isize)) }
        .map_err(|e| WindowError::Platform(e.to_string()))?;
    Ok(found)
}

impl WindowManager for Win32WindowManager {
    fn is_supported(&self) -> bool {
        true
    }

    fn visible_window_titles(&self) -> Result<Vec<String>, WindowError> {
        Ok(visible_windows()?
            .into_iter()
            .map(|(_, title)| title)
            .collect())
    }

    fn focus_window(&self, title: &str) -> Result<FocusOutcome, WindowError> {
        let Some((hwnd, _)) = visible_windows()?.into_iter().find(|(_, t)| t == title) else {
            return Ok(FocusOutcome::NotFound);
        };

        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Ok(FocusOutcome::FoundButNotFocused(
                    "SetForegroundWindow was refused".to_string(),
                ));
            }
        }
        info!("Focused window '{}'", title);
        Ok(FocusOutcome::Focused)
    }

    fn close_windows(&self, titles: &[String]) -> Result<usize, WindowError> {
        let targets: Vec<(HWND, String)> = visible_windows()?
            .into_iter()
            .filter(|(_, t)| titles.iter().any(|wanted| wanted == t))
            .collect();

        let mut closed = 0;
        for (hwnd, title) in targets {
            // Clients ask for confirmation on the first close; the second one confirms.
            let first = unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) };
            if let Err(e) = first {
                warn!("Could not close '{}': {}", title, e);
                continue;
            }
            std::thread::sleep(CLOSE_REPEAT_DELAY);
            if let Err(e) = unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) } {
                warn!("Second close message to '{}' failed: {}", title, e);
            }
            info!("Sent close messages to window '{}'", title);
            closed += 1;
        }
        Ok(closed)
    }
}
