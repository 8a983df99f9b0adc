//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Low-level utility functions and macros for images.
//!

use std;
use std::io::{self, Read, Write};
use std::slice;

/// Rounds `x` up to the closest multiple of `n`.
#[macro_export]
macro_rules! upmult {
    ($x:expr, $n:expr) => { (($x) + ($n) - 1) / ($n) * ($n) }
}

/// Produces a range of specified length.
#[macro_export]
macro_rules! range { ($start:expr, $len:expr) => { $start .. $start + $len } }

pub fn read_struct<T, R: Read>(read: &mut R) -> io::Result<T> {
    let num_bytes = ::std::mem::size_of::<T>();
    unsafe {
        let mut s = std::mem::MaybeUninit::<T>::uninit();
        let buffer: &mut [u8] = slice::from_raw_parts_mut(s.as_mut_ptr() as *mut u8, num_bytes);
        match read.read_exact(buffer) {
            Ok(()) => Ok(s.assume_init()),
            Err(e) => { ::std::mem::forget(s); Err(e) }
        }
    }
}

pub fn write_struct<T, W: Write>(obj: &T, write: &mut W) -> Result<(), io::Error> {
    let num_bytes = ::std::mem::size_of::<T>();
    unsafe {
        let buffer = slice::from_raw_parts(obj as *const T as *const u8, num_bytes);
        write.write_all(buffer)
    }
}

/// Allocates an uninitialized `Vec<T>` having `len` elements.
/// FIXME: allow only primitive `T`.
pub fn alloc_uninitialized<T>(len: usize) -> Vec<T> {
    let mut v = Vec::<T>::with_capacity(len);
    unsafe { v.set_len(len); }

    v
}
