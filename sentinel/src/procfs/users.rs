//! uid to user name resolution, cached per uid.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::ffi::CStr;

const INITIAL_BUFFER: usize = 1024;
const MAX_BUFFER: usize = 64 * 1024;

/// Cache of uid -> user name lookups
///
/// A uid without a passwd entry resolves to its decimal form.
#[derive(Debug, Default)]
pub struct UserNames {
    cache: HashMap<u32, String>,
}

impl UserNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, uid: u32) -> String {
        self.cache
            .entry(uid)
            .or_insert_with(|| lookup_user_name(uid).unwrap_or_else(|| uid.to_string()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn lookup_user_name(uid: u32) -> Option<String> {
    let mut buf: Vec<libc::c_char> = vec![0; INITIAL_BUFFER];
    loop {
        // SAFETY: passwd is a plain C struct; all-zero is a valid value
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        // SAFETY: every pointer refers to a live local of the advertised size
        let rc = unsafe {
            libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };

        if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
            return None;
        }

        // SAFETY: on success pw_name points into `buf` and is NUL-terminated
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        let name = name.to_string_lossy().into_owned();
        return (!name.is_empty()).then_some(name);
    }
}
