// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A simple example executable that manipulates pickle streams and formats
//! values to demonstrate the library's features.

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{stdin, stdout, Read};
use std::process::exit;

use serde_json as json;
use pyrt::{Heap, PickleOptions, Registry, UnpickleOptions};

fn main() -> Result<(), Box<dyn Error>> {
    let args = env::args().collect::<Vec<_>>();
    if args.len() < 2 {
        println!("Usage: pickle (decode | repr | transcode | to_json | from_json) [filename]");
        println!("       pickle format TEMPLATE [filename]");
        println!("");
        println!("Input is either given file or stdin.");
        println!("decode:    decode and display pickle");
        println!("repr:      decode and print the repr of the unpickled object");
        println!("transcode: decode and re-encode pickle with protocol 2");
        println!("to_json:   decode and jsonify pickle");
        println!("from_json: encode pickle from json");
        println!("format:    render TEMPLATE with the unpickled object as argument 0");
        exit(1);
    }

    let file_arg = if args[1] == "format" { 3 } else { 2 };
    let reader: Box<dyn Read> = if args.len() > file_arg {
        Box::new(File::open(&args[file_arg])?)
    } else {
        Box::new(stdin())
    };

    match &*args[1] {
        "decode" => {
            let decoded = pyrt::value_from_reader(reader, UnpickleOptions::new())?;
            println!("{:#?}", decoded);
        },
        "repr" => {
            let mut heap = Heap::new();
            let root = pyrt::load_from_reader(reader, &mut heap, &Registry::new(),
                                              UnpickleOptions::new())?;
            println!("{}", heap.repr(root));
        },
        "transcode" => {
            let mut heap = Heap::new();
            let registry = Registry::new();
            let root = pyrt::load_from_reader(reader, &mut heap, &registry,
                                              UnpickleOptions::new())?;
            pyrt::dump_to_writer(&mut stdout(), &mut heap, &registry, root,
                                 PickleOptions::new().proto(2))?;
        },
        "to_json" => {
            let decoded = pyrt::value_from_reader(reader, UnpickleOptions::new())?;
            println!("{}", json::to_string_pretty(&decoded)?);
        },
        "from_json" => {
            let decoded: pyrt::Value = json::from_reader(reader)?;
            pyrt::value_to_writer(&mut stdout(), &decoded, PickleOptions::new().proto(2))?;
        },
        "format" if args.len() > 2 => {
            let mut heap = Heap::new();
            let root = pyrt::load_from_reader(reader, &mut heap, &Registry::new(),
                                              UnpickleOptions::new())?;
            println!("{}", pyrt::render(&heap, &args[2], &[root], &[])?);
        },
        _ => {
            println!("No such subcommand.");
            exit(1);
        }
    }
    Ok(())
}
