//! Memory management programs

use super::{
    args_to_strs, check_help, parse_page_id, parse_size, take_json_flag, usage_error, write_json,
};
use crate::kernel::{Kernel, MemoryStats, Page, PageId};
use serde::Serialize;

pub const ALLOCATE_USAGE: &str = "allocate_memory <MB>";
pub const FREE_USAGE: &str = "free_memory <MB>";
pub const DEFRAGMENT_USAGE: &str = "defragment";
pub const STATUS_USAGE: &str = "memory_status";
pub const PAGE_FAULT_USAGE: &str = "page_fault <page_id>";
pub const SWAP_STORE_USAGE: &str = "swap_store <page_id> <data>";
pub const PAGE_WRITE_USAGE: &str = "page_write <page_id> <data>";
pub const PAGE_READ_USAGE: &str = "page_read <page_id>";

/// JSON shape of `memory_status`
#[derive(Serialize)]
struct MemoryStatus {
    stats: MemoryStats,
    pages: Vec<Page>,
}

pub fn prog_allocate_memory(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let size = match single_size(args, ALLOCATE_USAGE, stdout, stderr) {
        Ok(size) => size,
        Err(code) => return code,
    };

    match kernel.allocate(size) {
        Ok(pages) => {
            stdout.push_str(&format!("Allocated {}MB memory ({} pages).\n", size, pages.len()));
            0
        }
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

pub fn prog_free_memory(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let size = match single_size(args, FREE_USAGE, stdout, stderr) {
        Ok(size) => size,
        Err(code) => return code,
    };

    match kernel.free(size) {
        Ok(pages) => {
            stdout.push_str(&format!("Freed {}MB memory ({} pages).\n", size, pages.len()));
            0
        }
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

pub fn prog_defragment(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {} [--json]", DEFRAGMENT_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (json, rest) = take_json_flag(&args);
    if !rest.is_empty() {
        return usage_error(&format!("Usage: {} [--json]", DEFRAGMENT_USAGE), stderr);
    }

    let report = kernel.defragment();
    if json {
        return write_json(&report, stdout, stderr);
    }
    stdout.push_str(&format!(
        "Free memory: {}MB, Largest contiguous block: {}MB\n",
        report.free_mb, report.largest_contiguous_mb
    ));
    0
}

pub fn prog_memory_status(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {} [--json]", STATUS_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (json, rest) = take_json_flag(&args);
    if !rest.is_empty() {
        return usage_error(&format!("Usage: {} [--json]", STATUS_USAGE), stderr);
    }

    // One lock for a consistent view of pages and stats
    let status = {
        let memory = kernel.memory();
        MemoryStatus {
            stats: memory.stats(),
            pages: memory.pages().to_vec(),
        }
    };

    if json {
        return write_json(&status, stdout, stderr);
    }

    let stats = &status.stats;
    stdout.push_str(&format!(
        "Memory: {}MB in {} pages of {}MB ({} allocated, {} free, {} on disk)\n",
        stats.total_memory_mb,
        stats.total_pages,
        stats.page_size_mb,
        stats.allocated_pages,
        stats.free_pages,
        stats.disk_pages
    ));
    for page in &status.pages {
        stdout.push_str(&format!("  {}\n", page));
    }
    0
}

pub fn prog_page_fault(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", PAGE_FAULT_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let [arg] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", PAGE_FAULT_USAGE), stderr);
    };
    let page_id = match parse_page_id(arg) {
        Ok(id) => id,
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            return usage_error(&format!("Usage: {}", PAGE_FAULT_USAGE), stderr);
        }
    };

    if kernel.handle_page_fault(page_id) {
        stdout.push_str(&format!("Page {} swapped in.\n", page_id));
        0
    } else {
        stderr.push_str(&format!(
            "Page fault for page {} not handled (no disk image, or free frames remain).\n",
            page_id
        ));
        1
    }
}

pub fn prog_swap_store(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let (page_id, data) = match page_and_data(args, SWAP_STORE_USAGE, stdout, stderr) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };

    match kernel.memory().store_on_disk(page_id, data.into_bytes()) {
        Ok(()) => {
            stdout.push_str(&format!("Page {} stored on disk.\n", page_id));
            0
        }
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

pub fn prog_page_write(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let (page_id, data) = match page_and_data(args, PAGE_WRITE_USAGE, stdout, stderr) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };

    let len = data.len();
    match kernel.memory().write_page(page_id, data.into_bytes()) {
        Ok(()) => {
            stdout.push_str(&format!("Wrote {} bytes to page {}.\n", len, page_id));
            0
        }
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

pub fn prog_page_read(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", PAGE_READ_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let [arg] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", PAGE_READ_USAGE), stderr);
    };
    let page_id = match parse_page_id(arg) {
        Ok(id) => id,
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            return usage_error(&format!("Usage: {}", PAGE_READ_USAGE), stderr);
        }
    };

    let memory = kernel.memory();
    match memory.read_page(page_id) {
        Ok(Some(data)) => {
            stdout.push_str(&String::from_utf8_lossy(data));
            stdout.push('\n');
            0
        }
        Ok(None) => {
            stdout.push_str("(empty)\n");
            0
        }
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

/// Parse `<MB>`. `Err` carries the exit code once help or a usage error is written.
fn single_size(args: &[String], usage: &str, stdout: &mut String, stderr: &mut String) -> Result<u32, i32> {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", usage)) {
        stdout.push_str(&help);
        return Err(0);
    }

    let [arg] = args.as_slice() else {
        return Err(usage_error(&format!("Usage: {}", usage), stderr));
    };
    parse_size(arg).map_err(|e| {
        stderr.push_str(&format!("{}\n", e));
        usage_error(&format!("Usage: {}", usage), stderr)
    })
}

/// Parse `<page_id> <data...>`; the data words are joined with spaces
fn page_and_data(
    args: &[String],
    usage: &str,
    stdout: &mut String,
    stderr: &mut String,
) -> Result<(PageId, String), i32> {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", usage)) {
        stdout.push_str(&help);
        return Err(0);
    }

    let [id, data @ ..] = args.as_slice() else {
        return Err(usage_error(&format!("Usage: {}", usage), stderr));
    };
    if data.is_empty() {
        return Err(usage_error(&format!("Usage: {}", usage), stderr));
    }
    parse_page_id(id)
        .map(|page_id| (page_id, data.join(" ")))
        .map_err(|e| {
            stderr.push_str(&format!("{}\n", e));
            usage_error(&format!("Usage: {}", usage), stderr)
        })
}
