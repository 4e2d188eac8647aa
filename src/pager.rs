//! The page cache. Owns the file descriptor and a fixed-capacity array of
//! page slots; translates page numbers to mutable 4096-byte buffers and
//! flushes dirty pages on close.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::errors::{fatal, Error};
use crate::node::{Page, PAGE_SIZE, TABLE_MAX_PAGES};

pub struct Pager {
    file: File,
    file_length: u64,
    pub num_pages: u32,
    pages: heapless::Vec<Option<Page>, TABLE_MAX_PAGES>,
}

impl Pager {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            fatal(format!(
                "db file is not a whole number of pages. Corrupt file. length={}",
                file_length
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        let mut pages = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            let _ = pages.push(None);
        }
        tracing::debug!(file_length, num_pages, "pager opened");
        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages,
        })
    }

    /// Returns a mutable handle to page `n`, loading it from disk on first
    /// access. Fails fatally if `n` is outside the fixed slot array.
    pub fn get_page(&mut self, n: u32) -> Result<&mut Page, Error> {
        if n as usize >= TABLE_MAX_PAGES {
            fatal(format!(
                "tried to fetch page number {} out of bounds ({} max)",
                n, TABLE_MAX_PAGES
            ));
        }

        if self.pages[n as usize].is_none() {
            let mut buf = [0u8; PAGE_SIZE];
            let num_full_pages = self.file_length / PAGE_SIZE as u64;
            if (n as u64) < num_full_pages
                || ((n as u64) == num_full_pages && self.file_length % PAGE_SIZE as u64 != 0)
            {
                self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
                let read = self.file.read(&mut buf)?;
                if read < PAGE_SIZE {
                    tracing::warn!(page = n, read, "short read while loading page");
                }
            }
            self.pages[n as usize] = Some(buf);
            tracing::debug!(page = n, "loaded page from disk");
            if n >= self.num_pages {
                self.num_pages = n + 1;
            }
        } else {
            tracing::trace!(page = n, "page cache hit");
        }

        Ok(self.pages[n as usize].as_mut().unwrap())
    }

    /// Returns the page number that the *next* `get_page` call would
    /// materialise. No free-list reuse: pages are never freed within a
    /// session.
    pub fn allocate_page(&self) -> u32 {
        self.num_pages
    }

    pub fn flush(&mut self, n: u32) -> Result<(), Error> {
        let page = self.pages[n as usize]
            .as_ref()
            .unwrap_or_else(|| fatal(format!("tried to flush an empty page slot {}", n)));
        self.file.seek(SeekFrom::Start(n as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page)?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), Error> {
        let mut flushed = 0;
        for n in 0..self.num_pages {
            if self.pages[n as usize].is_some() {
                self.flush(n)?;
                self.pages[n as usize] = None;
                flushed += 1;
            }
        }
        self.file.flush()?;
        tracing::info!(flushed, "pager closed");
        Ok(())
    }
}
