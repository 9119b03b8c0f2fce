// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.


macro_rules! pyobj {
    (n=None)     => { Value::None };
    (b=True)     => { Value::Bool(true) };
    (b=False)    => { Value::Bool(false) };
    (i=$i:expr)  => { Value::I64($i) };
    (ii=$i:expr) => { Value::Int($i.clone()) };
    (f=$f:expr)  => { Value::F64($f) };
    (bb=$b:expr) => { Value::Bytes($b.to_vec()) };
    (s=$s:expr)  => { Value::String($s.into()) };
    (t=($($m:ident=$v:tt),*))  => { Value::Tuple(vec![$(pyobj!($m=$v)),*]) };
    (l=[$($m:ident=$v:tt),*])  => { Value::List(vec![$(pyobj!($m=$v)),*]) };
    (d={$($km:ident=$kv:tt => $vm:ident=$vv:tt),*}) => {
        Value::Dict(vec![$((pyobj!($km=$kv), pyobj!($vm=$vv))),*]) };
}

mod value_tests {
    use std::f64;
    use num_bigint::BigInt;
    use num_traits::Signed;
    use quickcheck::{QuickCheck, StdGen};
    use rand::{thread_rng, RngCore};
    use crate::{value_from_slice, value_from_iter, value_from_reader, value_to_vec};
    use crate::{Error, ErrorCode, ErrorKind, PickleOptions, UnpickleOptions, Value};

    fn roundtrip(value: &Value, proto: u8) -> Value {
        let bytes = value_to_vec(value, PickleOptions::new().proto(proto)).unwrap();
        value_from_slice(&bytes, UnpickleOptions::new()).unwrap()
    }

    fn sample_value() -> Value {
        let longint = -BigInt::from(2).pow(70u32);
        pyobj!(d={
            n=None           => l=[i=1, f=2.5, n=None],
            b=False          => t=(b=True, i=(-7)),
            i=10             => ii=longint,
            f=1.0            => bb=b"bytes\n\x00\xff'\"",
            s="string"       => s="unicode \\ \u{e9}\u{20ac}\u{1f600}\n\r",
            t=(i=1, s="a")   => d={s="k" => l=[]},
            bb=b"key"        => t=()
        })
    }

    #[test]
    fn roundtrip_all_protocols() {
        let value = sample_value();
        for proto in 0..3 {
            assert_eq!(roundtrip(&value, proto), value, "protocol {}", proto);
        }
    }

    #[test]
    fn roundtrip_globals_and_objects() {
        let value = Value::List(vec![
            Value::Global { module: "collections".into(), name: "OrderedDict".into() },
            Value::Object {
                module: "models".into(),
                name: "Point".into(),
                attrs: vec![(pyobj!(s="x"), pyobj!(i=3)), (pyobj!(s="y"), pyobj!(f=-0.5))],
            },
            Value::Object { module: "models".into(), name: "Empty".into(), attrs: vec![] },
        ]);
        for proto in 0..3 {
            assert_eq!(roundtrip(&value, proto), value, "protocol {}", proto);
        }
    }

    #[test]
    fn integer_boundaries() {
        let big = BigInt::from(2).pow(64u32);
        let values = vec![
            pyobj!(i=0), pyobj!(i=255), pyobj!(i=256), pyobj!(i=65535), pyobj!(i=65536),
            pyobj!(i=-1), pyobj!(i=2147483647), pyobj!(i=2147483648), pyobj!(i=-2147483648),
            pyobj!(i=-2147483649), pyobj!(i=i64::max_value()), pyobj!(i=i64::min_value()),
            pyobj!(ii=big), Value::Int(-big.clone()), Value::Int(big.clone() * &big),
        ];
        let value = Value::List(values);
        for proto in 0..3 {
            assert_eq!(roundtrip(&value, proto), value, "protocol {}", proto);
        }
    }

    #[test]
    fn special_floats() {
        for proto in 0..3 {
            for &f in &[f64::INFINITY, f64::NEG_INFINITY, 1e300, 5e-324, -0.0, 0.1] {
                match roundtrip(&pyobj!(f=f), proto) {
                    Value::F64(g) => assert_eq!(g.to_bits(), f.to_bits(), "{} at {}", f, proto),
                    other => panic!("not a float: {:?}", other),
                }
            }
            match roundtrip(&pyobj!(f=f64::NAN), proto) {
                Value::F64(g) => assert!(g.is_nan()),
                other => panic!("not a float: {:?}", other),
            }
        }
    }

    #[test]
    fn unpickle_python2_streams() {
        // pickle.dumps({'a': [1, 2.5, None, True, u'\xe9']}, 0)
        let stream = b"(dp0\nS'a'\np1\n(lp2\nI1\naF2.5\naNaI01\naV\xe9\np3\na.";
        assert_eq!(value_from_slice(stream, UnpickleOptions::new()).unwrap(),
                   pyobj!(d={bb=b"a" => l=[i=1, f=2.5, n=None, b=True, s="\u{e9}"]}));

        // Binary opcodes without a PROTO header
        let stream = b"(K\x01U\x03x'yq\x00X\x03\x00\x00\x00\xe2\x82\xacq\x01\x8a\x01\x01\
                       G?\xf8\x00\x00\x00\x00\x00\x00tq\x02.";
        assert_eq!(value_from_slice(stream, UnpickleOptions::new()).unwrap(),
                   pyobj!(t=(i=1, bb=b"x'y", s="\u{20ac}", i=1, f=1.5)));

        // Text strings with escapes, as the repr() of a str
        let stream = b"S'a\\'b\\\\c\\x41\\n\\101'\np0\n.";
        assert_eq!(value_from_slice(stream, UnpickleOptions::new()).unwrap(),
                   pyobj!(bb=b"a'b\\cA\nA"));
        let stream = b"Vx\\u20acy\\U0001f600\np0\n.";
        assert_eq!(value_from_slice(stream, UnpickleOptions::new()).unwrap(),
                   pyobj!(s="x\u{20ac}y\u{1f600}"));
        let stream = b"L-12345678901234567890L\n.";
        assert_eq!(value_from_slice(stream, UnpickleOptions::new()).unwrap(),
                   Value::Int("-12345678901234567890".parse().unwrap()));
    }

    #[test]
    fn from_reader_and_iter() {
        let value = sample_value();
        let bytes = value_to_vec(&value, PickleOptions::new()).unwrap();
        assert_eq!(value_from_reader(&bytes[..], UnpickleOptions::new()).unwrap(), value);
        assert_eq!(value_from_iter(bytes.iter().cloned(), UnpickleOptions::new()).unwrap(), value);
    }

    #[test]
    fn serde_json_interop() {
        let value = pyobj!(d={s="a" => l=[i=1, f=2.5, n=None, b=True], s="b" => t=(s="x")});
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"a":[1,2.5,null,true],"b":["x"]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pyobj!(d={s="a" => l=[i=1, f=2.5, n=None, b=True], s="b" => l=[s="x"]}));

        let object = Value::Object {
            module: "m".into(), name: "C".into(), attrs: vec![(pyobj!(s="x"), pyobj!(i=1))],
        };
        assert_eq!(serde_json::to_string(&object).unwrap(),
                   r#"{"module":"m","name":"C","attrs":{"x":1}}"#);
        let huge = Value::Int(BigInt::from(2).pow(80u32));
        assert_eq!(serde_json::to_string(&huge).unwrap(), r#""1208925819614629174706176""#);
    }

    #[test]
    fn display_is_repr() {
        assert_eq!(pyobj!(t=(i=1)).to_string(), "(1,)");
        assert_eq!(pyobj!(t=()).to_string(), "()");
        assert_eq!(pyobj!(l=[f=1e16, f=0.5, n=None, b=False]).to_string(),
                   "[1e+16, 0.5, None, False]");
        assert_eq!(pyobj!(d={s="it's" => bb=b"\x00"}).to_string(), r#"{"it's": b'\x00'}"#);
        let global = Value::Global { module: "m".into(), name: "C".into() };
        assert_eq!(global.to_string(), "<class 'm.C'>");
    }

    #[test]
    fn snapshot_rejects_cycles() {
        // l = []; l.append(l)
        let stream = b"\x80\x02]q\x00h\x00a.";
        match value_from_slice(stream, UnpickleOptions::new()) {
            Err(err @ Error::Syntax(ErrorCode::Recursive)) => assert_eq!(err.kind(), ErrorKind::Value),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn huge_ints_keep_their_sign() {
        let value = Value::Int(-BigInt::from(2).pow(2100u32));
        for proto in 0..3 {
            match roundtrip(&value, proto) {
                Value::Int(ref i) => assert!(i.is_negative()),
                other => panic!("not an int: {:?}", other),
            }
        }
    }

    #[test]
    fn qc_roundtrip() {
        fn roundtrip_holds(original: Value) -> bool {
            (0..3).all(|proto| roundtrip(&original, proto) == original)
        }
        QuickCheck::new().gen(StdGen::new(thread_rng(), 10))
                         .tests(500)
                         .quickcheck(roundtrip_holds as fn(_) -> _);
    }

    #[test]
    fn fuzz_unpickling_never_panics() {
        let mut data = vec![0u8; 1000];
        for _ in 0..500 {
            thread_rng().fill_bytes(&mut data);
            let _ = value_from_slice(&data, UnpickleOptions::new());
        }
        // Streams made mostly of valid opcodes reach deeper into the machine.
        let opcodes = b"(.01NI\nL\nF\nS\nV\nX\x00\x00\x00\x00K\x00M\x00\x00\
                        J\x00\x00\x00\x00G\x00\x00\x00\x00\x00\x00\x00\x00\
                        ]})tl d a e s u b R\x81 p0\nq\x00h\x00g0\n\x85\x86\x87\x88\x89\x80\x02";
        for _ in 0..500 {
            let len = 1 + (thread_rng().next_u32() % 60) as usize;
            let stream: Vec<u8> = (0..len)
                .map(|_| opcodes[(thread_rng().next_u32() as usize) % opcodes.len()])
                .collect();
            let _ = value_from_slice(&stream, UnpickleOptions::new());
        }
    }
}

mod pickle_tests {
    use num_bigint::BigInt;
    use crate::{dump_to_vec, load_from_slice, Pickler, Unpickler};
    use crate::{ClassHooks, Error, ErrorCode, ErrorKind, Heap, Object, ObjRef, PickleOptions,
                QualName, Registry, Result, UnpickleOptions, Value};

    fn opts(proto: u8) -> PickleOptions {
        PickleOptions::new().proto(proto)
    }

    fn dump(heap: &mut Heap, root: ObjRef, proto: u8) -> Vec<u8> {
        dump_to_vec(heap, &Registry::new(), root, opts(proto)).unwrap()
    }

    fn load(heap: &mut Heap, stream: &[u8]) -> Result<ObjRef> {
        load_from_slice(stream, heap, &Registry::new(), UnpickleOptions::new())
    }

    fn items(heap: &Heap, obj: ObjRef) -> Vec<ObjRef> {
        match *heap.get(obj) {
            Object::List(ref items) | Object::Tuple(ref items) => items.clone(),
            ref other => panic!("not a sequence: {:?}", other),
        }
    }

    fn count(stream: &[u8], opcode: u8) -> usize {
        stream.iter().filter(|&&b| b == opcode).count()
    }

    fn eval_error(result: Result<ObjRef>) -> (ErrorCode, usize) {
        match result {
            Err(Error::Eval(code, pos)) => (code, pos),
            other => panic!("expected an unpickling error, got {:?}", other),
        }
    }

    #[test]
    fn shared_string_is_written_once() {
        let mut heap = Heap::new();
        let s = heap.str("x");
        let list = heap.list(vec![s, s]);
        assert_eq!(dump(&mut heap, list, 2), b"\x80\x02]q\x00(X\x01\x00\x00\x00xq\x01h\x01e.");
        assert_eq!(dump(&mut heap, list, 0), b"(lp0\nVx\np1\nag1\na.");

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, list, proto);
            let loaded = load(&mut other, &stream).unwrap();
            let loaded_items = items(&other, loaded);
            assert_eq!(loaded_items[0], loaded_items[1]);
            assert!(heap.equivalent(list, &other, loaded));
        }
    }

    #[test]
    fn mixed_integer_tuple_matches_python() {
        let mut heap = Heap::new();
        let values = vec![
            heap.int(1), heap.int(-1), heap.int(300), heap.int(70000),
            heap.int(1 << 40), heap.long(-BigInt::from(2).pow(70u32)),
        ];
        let tuple = heap.tuple(values);
        assert_eq!(dump(&mut heap, tuple, 2),
                   &b"\x80\x02(K\x01J\xff\xff\xff\xffM\x2c\x01J\x70\x11\x01\x00I1099511627776\n\
                      \x8a\x09\x00\x00\x00\x00\x00\x00\x00\x00\xc0tq\x00."[..]);
    }

    #[test]
    fn booleans_and_none() {
        let mut heap = Heap::new();
        let t = heap.tuple(vec![heap.bool(true), heap.bool(false), heap.none()]);
        assert_eq!(dump(&mut heap, t, 2), b"\x80\x02\x88\x89N\x87q\x00.");
        assert_eq!(dump(&mut heap, t, 1), b"(I01\nI00\nNtq\x00.");
        assert_eq!(dump(&mut heap, t, 0), b"(I01\nI00\nNtp0\n.");
    }

    #[test]
    fn empty_tuple_is_never_memoized() {
        let mut heap = Heap::new();
        let empty = heap.tuple(vec![]);
        let list = heap.list(vec![empty, empty]);
        assert_eq!(dump(&mut heap, list, 2), b"\x80\x02]q\x00())e.");
    }

    #[test]
    fn self_referencing_list() {
        let mut heap = Heap::new();
        let list = heap.list(vec![]);
        heap.list_append(list, list).unwrap();
        assert_eq!(dump(&mut heap, list, 2), b"\x80\x02]q\x00h\x00a.");
        assert_eq!(dump(&mut heap, list, 0), b"(lp0\ng0\na.");

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, list, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert_eq!(items(&other, loaded), vec![loaded]);
        }
    }

    #[test]
    fn self_referencing_dict() {
        let mut heap = Heap::new();
        let dict = heap.dict();
        let key = heap.str("self");
        heap.dict_set(dict, key, dict).unwrap();
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, dict, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert_eq!(other.dict_get_str(loaded, "self"), Some(loaded));
        }
    }

    /// t = ([],); t[0].append(t)
    fn tuple_cycle(heap: &mut Heap) -> ObjRef {
        let list = heap.list(vec![]);
        let tuple = heap.tuple(vec![list]);
        heap.list_append(list, tuple).unwrap();
        tuple
    }

    #[test]
    fn tuple_cycle_through_list() {
        let mut heap = Heap::new();
        let tuple = tuple_cycle(&mut heap);
        assert_eq!(dump(&mut heap, tuple, 2), b"\x80\x02]q\x00h\x00\x85q\x01a0h\x01.");
        assert_eq!(dump(&mut heap, tuple, 1), b"(]q\x00(h\x00tq\x01a1h\x01.");
        assert_eq!(dump(&mut heap, tuple, 0), b"((lp0\n(g0\ntp1\na00g1\n.");

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, tuple, proto);
            let loaded = load(&mut other, &stream).unwrap();
            let list = items(&other, loaded)[0];
            assert_eq!(items(&other, list), vec![loaded], "protocol {}", proto);
        }
    }

    #[test]
    fn memo_positions_beyond_one_byte() {
        let mut heap = Heap::new();
        let strings: Vec<ObjRef> = (0..300).map(|i| heap.str(format!("s{}", i))).collect();
        let mut all = strings.clone();
        all.extend(&strings);
        let list = heap.list(all);
        let stream = dump(&mut heap, list, 2);
        // The list takes position 0, so s255 is at 256.
        assert!(stream.windows(5).any(|w| w == b"r\x00\x01\x00\x00"));
        assert!(stream.windows(5).any(|w| w == b"j\x00\x01\x00\x00"));

        let mut other = Heap::new();
        let loaded = load(&mut other, &stream).unwrap();
        let loaded_items = items(&other, loaded);
        assert_eq!(loaded_items.len(), 600);
        for i in 0..300 {
            assert_eq!(loaded_items[i], loaded_items[i + 300]);
        }
        assert!(heap.equivalent(list, &other, loaded));
    }

    #[test]
    fn appends_are_batched() {
        let mut heap = Heap::new();
        let zeros: Vec<ObjRef> = (0..2500).map(|_| heap.int(0)).collect();
        let list = heap.list(zeros);
        let stream = dump(&mut heap, list, 2);
        assert_eq!(count(&stream, b'('), 3);
        assert_eq!(count(&stream, b'e'), 3);
        assert_eq!(count(&stream, b'a'), 0);

        let zeros: Vec<ObjRef> = (0..1025).map(|_| heap.int(0)).collect();
        let list = heap.list(zeros);
        let stream = dump(&mut heap, list, 1);
        assert_eq!(count(&stream, b'e'), 1);
        assert_eq!(count(&stream, b'a'), 1);

        let mut other = Heap::new();
        let loaded = load(&mut other, &stream).unwrap();
        assert_eq!(items(&other, loaded).len(), 1025);
    }

    #[test]
    fn large_dicts_roundtrip() {
        let mut heap = Heap::new();
        let dict = heap.dict();
        for i in 0..3000 {
            let key = heap.int(i);
            let value = heap.str(format!("v{}", i));
            heap.dict_set(dict, key, value).unwrap();
        }
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, dict, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert_eq!(other.dict_items(loaded).len(), 3000);
            assert!(heap.equivalent(dict, &other, loaded));
        }
    }

    #[test]
    fn memo_is_shared_between_dumps() {
        let mut heap = Heap::new();
        let s = heap.str("x");
        let registry = Registry::new();
        let mut stream = Vec::new();
        {
            let mut pickler = Pickler::new(&mut stream, &mut heap, &registry, opts(2)).unwrap();
            pickler.dump(s).unwrap();
            pickler.dump(s).unwrap();
            pickler.clear_memo();
            pickler.dump(s).unwrap();
        }
        assert_eq!(stream, &b"\x80\x02X\x01\x00\x00\x00xq\x00.\x80\x02h\x00.\
                             \x80\x02X\x01\x00\x00\x00xq\x00."[..]);

        let mut other = Heap::new();
        let mut unpickler = Unpickler::new(&stream[..], &mut other, &registry,
                                           UnpickleOptions::new());
        let first = unpickler.load().unwrap();
        let second = unpickler.load().unwrap();
        let third = unpickler.load().unwrap();
        unpickler.end().unwrap();
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn unsupported_protocol() {
        let mut heap = Heap::new();
        let none = heap.none();
        match dump_to_vec(&mut heap, &Registry::new(), none, opts(3)) {
            Err(Error::Pickle(ErrorCode::UnsupportedProtocol(3))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(eval_error(load(&mut heap, b"\x80\x03N.")),
                   (ErrorCode::UnsupportedProtocol(3), 0));
        assert_eq!(eval_error(load(&mut heap, b"N\x80\x05.")),
                   (ErrorCode::UnsupportedProtocol(5), 1));
    }

    #[test]
    fn malformed_streams() {
        let mut heap = Heap::new();
        for stream in &[&b""[..], b"\x80\x02]", b"K", b"X\x05\x00\x00\x00abc", b"I12"] {
            let err = load(&mut heap, stream).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Eof, "{:?}", stream);
        }
        let err = load(&mut heap, b"h\x05.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadMemoReference);
        assert_eq!(eval_error(Err(err)), (ErrorCode::MissingMemo(5), 0));
        assert_eq!(eval_error(load(&mut heap, b"NNg7\n.")), (ErrorCode::MissingMemo(7), 2));
        assert_eq!(eval_error(load(&mut heap, b"t.")), (ErrorCode::MarkNotFound, 0));
        assert_eq!(eval_error(load(&mut heap, b"0.")), (ErrorCode::StackUnderflow, 0));
        assert_eq!(eval_error(load(&mut heap, b"N.N")), (ErrorCode::TrailingBytes, 2));
        assert_eq!(eval_error(load(&mut heap, b"N\xff.")), (ErrorCode::Unsupported('\u{ff}'), 1));
        assert_eq!(eval_error(load(&mut heap, b"}]Ns.")), (ErrorCode::ValueNotHashable, 3));
        assert_eq!(eval_error(load(&mut heap, b"I1x\n.")),
                   (ErrorCode::InvalidLiteral(b"1x".to_vec()), 0));
        assert_eq!(eval_error(load(&mut heap, b"NK\x01R.")),
                   (ErrorCode::InvalidStackTop("tuple", "int".into()), 3));
        match eval_error(load(&mut heap, b"(NNNd.")) {
            (ErrorCode::InvalidValue(_), 4) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn trailing_bytes_may_be_allowed() {
        let mut heap = Heap::new();
        let options = UnpickleOptions::new().check_trailing(false);
        let obj = load_from_slice(b"K\x07.garbage", &mut heap, &Registry::new(), options).unwrap();
        match *heap.get(obj) {
            Object::Int(7) => {}
            ref other => panic!("unexpected object: {:?}", other),
        }
    }

    #[test]
    fn depth_limits() {
        let mut heap = Heap::new();
        let mut list = heap.list(vec![]);
        for _ in 0..100 {
            list = heap.list(vec![list]);
        }
        let options = PickleOptions::new().max_depth(50);
        let err = dump_to_vec(&mut heap, &Registry::new(), list, options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Depth);
        assert!(dump_to_vec(&mut heap, &Registry::new(), list, opts(2)).is_ok());

        let options = UnpickleOptions::new().max_depth(3);
        match load_from_slice(b"((((N", &mut heap, &Registry::new(), options) {
            Err(Error::Eval(ErrorCode::MaxDepthExceeded, 3)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn nested_list(heap: &mut Heap, depth: usize) -> ObjRef {
        let mut list = heap.list(vec![]);
        for _ in 1..depth {
            list = heap.list(vec![list]);
        }
        list
    }

    #[test]
    fn deep_nesting_within_the_default_limit() {
        let mut heap = Heap::new();
        let list = nested_list(&mut heap, 1990);
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, list, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert!(heap.equivalent(list, &other, loaded), "protocol {}", proto);
        }
    }

    #[test]
    fn deep_nesting_beyond_the_default_limit() {
        let mut heap = Heap::new();
        let list = nested_list(&mut heap, 2500);
        for proto in 0..3 {
            let err = dump_to_vec(&mut heap, &Registry::new(), list, opts(proto)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Depth, "protocol {}", proto);
        }
        // A much deeper graph fails the same way.
        let list = nested_list(&mut heap, 100_000);
        let err = dump_to_vec(&mut heap, &Registry::new(), list, opts(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Depth);
    }

    #[test]
    fn tuple_containing_itself_hits_the_depth_limit() {
        let mut heap = Heap::new();
        let one = heap.int(1);
        let tuple = heap.tuple(vec![one]);
        if let Object::Tuple(ref mut items) = *heap.get_mut(tuple) {
            items.push(tuple);
        }
        for proto in 0..3 {
            let err = dump_to_vec(&mut heap, &Registry::new(), tuple, opts(proto)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Depth, "protocol {}", proto);
        }
    }

    #[test]
    fn repeated_dumps_do_not_grow_the_heap() {
        let mut heap = Heap::new();
        let class = heap.global("mod", "Bag");
        let inst = heap.instance(class, false);
        let (one, two, key) = (heap.int(1), heap.int(2), heap.str("k"));
        heap.setattr(inst, "a", one).unwrap();
        heap.list_append(inst, two).unwrap();
        heap.dict_set(inst, key, one).unwrap();
        for proto in 0..3 {
            let first = dump(&mut heap, inst, proto);
            let size = heap.len();
            for _ in 0..100 {
                assert_eq!(dump(&mut heap, inst, proto), first);
            }
            assert_eq!(heap.len(), size, "protocol {}", proto);
        }
    }

    #[test]
    fn large_dicts_build_in_linear_time() {
        use std::time::{Duration, Instant};

        let start = Instant::now();
        let mut heap = Heap::new();
        let dict = heap.dict();
        for i in 0..50_000 {
            let (key, value) = (heap.int(i), heap.int(-i));
            heap.dict_set(dict, key, value).unwrap();
        }
        let stream = dump(&mut heap, dict, 2);
        let mut other = Heap::new();
        let loaded = load(&mut other, &stream).unwrap();
        assert!(start.elapsed() < Duration::from_secs(10), "took {:?}", start.elapsed());

        assert_eq!(other.dict_items(loaded).len(), 50_000);
        let key = other.float(49_999.0);
        let value = other.dict_get(loaded, key).unwrap();
        assert!(matches!(*other.get(value), Object::Int(-49_999)));
        let key = other.long(BigInt::from(12_345));
        let value = other.dict_get(loaded, key).unwrap();
        assert!(matches!(*other.get(value), Object::Int(-12_345)));
        let key = other.int(50_000);
        assert_eq!(other.dict_get(loaded, key), None);
    }

    #[test]
    fn bad_global_names() {
        let mut heap = Heap::new();
        let global = heap.global("mod", "evil\nname");
        let err = dump_to_vec(&mut heap, &Registry::new(), global, opts(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Pickling);
    }

    #[test]
    fn globals_keep_identity() {
        let mut heap = Heap::new();
        let stream = b"(cmod\nCls\ncmod\nCls\nt.";
        let loaded = load(&mut heap, stream).unwrap();
        let loaded_items = items(&heap, loaded);
        assert_eq!(loaded_items[0], loaded_items[1]);
        assert_eq!(heap.qualname(loaded_items[0]), Some(&QualName::new("mod", "Cls")));
    }

    #[test]
    fn module_loader_refuses_globals() {
        let mut registry = Registry::new();
        registry.set_module_loader(|name: &QualName| {
            if name.module == "os" {
                Err(Error::Syntax(ErrorCode::InvalidValue("forbidden".into())))
            } else {
                Ok(())
            }
        });
        let mut heap = Heap::new();
        let result = load_from_slice(b"N(cos\nsystem\n.", &mut heap, &registry,
                                     UnpickleOptions::new());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unpickling);
        assert_eq!(eval_error(Err(err)),
                   (ErrorCode::UnresolvedGlobal("os".into(), "system".into()), 2));
        assert!(load_from_slice(b"cmath\nsqrt\n.", &mut heap, &registry,
                                UnpickleOptions::new()).is_ok());
    }

    #[test]
    fn extension_codes() {
        let mut registry = Registry::new();
        let name = QualName::new("mod", "Cls");
        registry.add_extension(name.clone(), 0x1234).unwrap();
        registry.add_extension(name.clone(), 0x1234).unwrap();
        assert!(registry.add_extension(name.clone(), 7).is_err());
        assert!(registry.add_extension(QualName::new("mod", "Other"), 0x1234).is_err());
        assert!(registry.add_extension(QualName::new("mod", "Zero"), 0).is_err());
        registry.add_extension(QualName::new("mod", "Small"), 0xff).unwrap();
        registry.add_extension(QualName::new("mod", "Large"), 0x12345).unwrap();

        let mut heap = Heap::new();
        let cls = heap.global("mod", "Cls");
        let small = heap.global("mod", "Small");
        let large = heap.global("mod", "Large");
        let t = heap.tuple(vec![cls, small, large]);
        let stream = dump_to_vec(&mut heap, &registry, t, opts(2)).unwrap();
        assert_eq!(stream, b"\x80\x02\x83\x34\x12\x82\xff\x84\x45\x23\x01\x00\x87q\x00.");
        // Older protocols name the global.
        let stream1 = dump_to_vec(&mut heap, &registry, cls, opts(1)).unwrap();
        assert_eq!(stream1, b"cmod\nCls\nq\x00.");

        let mut other = Heap::new();
        let loaded = load_from_slice(&stream, &mut other, &registry,
                                     UnpickleOptions::new()).unwrap();
        assert!(heap.equivalent(t, &other, loaded));

        assert_eq!(eval_error(load(&mut other, &stream)),
                   (ErrorCode::UnregisteredExtension(0x1234), 2));

        registry.remove_extension(&name, 0x1234).unwrap();
        assert_eq!(registry.extension_code(&name), None);
        assert!(registry.remove_extension(&name, 0x1234).is_err());
    }

    #[test]
    fn persistent_ids() {
        let row = QualName::new("db", "Row");
        for proto in 0..3 {
            let mut heap = Heap::new();
            let native = heap.native(row.clone(), vec![7]);
            let plain = heap.str("plain");
            let list = heap.list(vec![native, plain]);
            let registry = Registry::new();
            let mut stream = Vec::new();
            {
                let mut pickler = Pickler::new(&mut stream, &mut heap, &registry,
                                               opts(proto)).unwrap();
                pickler.persistent_id(|heap: &mut Heap, obj: ObjRef| {
                    let pid = match *heap.get(obj) {
                        Object::Native(ref n) if n.class.name == "Row" =>
                            Some(format!("row:{}", n.data[0])),
                        _ => None,
                    };
                    pid.map(|pid| heap.str(pid))
                });
                pickler.dump(list).unwrap();
            }
            if proto == 0 {
                assert_eq!(stream, b"(lp0\nProw:7\naVplain\np1\na.");
            } else {
                assert_eq!(count(&stream, b'Q'), 1);
            }

            let mut other = Heap::new();
            assert_eq!(eval_error(load(&mut other, &stream)).0, ErrorCode::NoPersistentLoad);

            let loaded = {
                let mut unpickler = Unpickler::new(&stream[..], &mut other, &registry,
                                                   UnpickleOptions::new());
                unpickler.persistent_load(|heap: &mut Heap, pid: ObjRef| {
                    let text = heap.str_of(pid);
                    Ok(heap.str(format!("loaded {}", text)))
                });
                unpickler.load().unwrap()
            };
            assert_eq!(other.to_value(loaded).unwrap(),
                       pyobj!(l=[s="loaded row:7", s="plain"]));
        }
    }

    #[test]
    fn persistent_ids_with_newlines_need_binary_protocols() {
        let mut heap = Heap::new();
        let native = heap.native(QualName::new("db", "Row"), vec![]);
        let registry = Registry::new();
        let mut pickler = Pickler::new(Vec::new(), &mut heap, &registry, opts(0)).unwrap();
        pickler.persistent_id(|heap: &mut Heap, _| Some(heap.str("a\nb")));
        assert_eq!(pickler.dump(native).unwrap_err().kind(), ErrorKind::Pickling);
    }

    #[test]
    fn classic_instances() {
        let mut heap = Heap::new();
        let class = heap.global("mod", "Old");
        let inst = heap.instance(class, true);
        let one = heap.int(1);
        heap.setattr(inst, "a", one).unwrap();
        assert_eq!(dump(&mut heap, inst, 0), b"(imod\nOld\np0\n(dp1\nVa\np2\nI1\nsb.");
        assert_eq!(dump(&mut heap, inst, 1),
                   &b"(cmod\nOld\nq\x00oq\x01}q\x02X\x01\x00\x00\x00aq\x03K\x01sb."[..]);

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, inst, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert!(heap.equivalent(inst, &other, loaded), "protocol {}", proto);
        }
    }

    /// An old-style class whose constructor takes the two attributes.
    struct PairHooks;

    impl ClassHooks for PairHooks {
        fn getinitargs(&self, heap: &mut Heap, obj: ObjRef) -> Result<Option<ObjRef>> {
            let a = heap.getattr(obj, "a").unwrap();
            let b = heap.getattr(obj, "b").unwrap();
            Ok(Some(heap.tuple(vec![a, b])))
        }

        fn getstate(&self, heap: &mut Heap, _obj: ObjRef) -> Result<Option<ObjRef>> {
            Ok(Some(heap.dict()))
        }

        fn call(&self, heap: &mut Heap, cls: ObjRef, args: &[ObjRef]) -> Result<Option<ObjRef>> {
            let inst = heap.instance(cls, true);
            heap.setattr(inst, "a", args[0]).map_err(Error::Syntax)?;
            heap.setattr(inst, "b", args[1]).map_err(Error::Syntax)?;
            Ok(Some(inst))
        }
    }

    #[test]
    fn classic_instances_with_init_args() {
        let mut registry = Registry::new();
        registry.register_class(QualName::new("mod", "Pair"), PairHooks);
        let mut heap = Heap::new();
        let class = heap.global("mod", "Pair");
        let inst = heap.instance(class, true);
        let (a, b) = (heap.int(1), heap.str("two"));
        heap.setattr(inst, "a", a).unwrap();
        heap.setattr(inst, "b", b).unwrap();

        let stream = dump_to_vec(&mut heap, &registry, inst, opts(0)).unwrap();
        assert_eq!(stream, b"(I1\nVtwo\np0\nimod\nPair\np1\n(dp2\nb.");
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump_to_vec(&mut heap, &registry, inst, opts(proto)).unwrap();
            let loaded = load_from_slice(&stream, &mut other, &registry,
                                         UnpickleOptions::new()).unwrap();
            assert!(heap.equivalent(inst, &other, loaded), "protocol {}", proto);
        }
        // Without the hooks, the class cannot be called with arguments.
        let err = load(&mut other, &stream).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unpickling);
    }

    #[test]
    fn default_reduction_of_new_style_instances() {
        let mut heap = Heap::new();
        let class = heap.global("mod", "New");
        let inst = heap.instance(class, false);
        let one = heap.int(1);
        heap.setattr(inst, "a", one).unwrap();

        let stream = dump(&mut heap, inst, 2);
        assert_eq!(stream, &b"\x80\x02cmod\nNew\nq\x00)\x81q\x01}q\x02X\x01\x00\x00\x00aq\x03\
                              K\x01sb."[..]);
        let stream = dump(&mut heap, inst, 1);
        assert!(stream.starts_with(b"ccopy_reg\n_reconstructor\nq\x00(cmod\nNew\nq\x01\
                                     c__builtin__\nobject\nq\x02Ntq\x03Rq\x04"));

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, inst, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert!(heap.equivalent(inst, &other, loaded), "protocol {}", proto);
        }
    }

    #[test]
    fn instance_referring_to_itself() {
        let mut heap = Heap::new();
        let class = heap.global("mod", "Node");
        let inst = heap.instance(class, false);
        heap.setattr(inst, "me", inst).unwrap();
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, inst, proto);
            let loaded = load(&mut other, &stream).unwrap();
            assert_eq!(other.getattr(loaded, "me"), Some(loaded), "protocol {}", proto);
        }
    }

    #[test]
    fn list_and_dict_like_instances() {
        let mut heap = Heap::new();
        let class = heap.global("mod", "Bag");
        let inst = heap.instance(class, false);
        let (one, two, key) = (heap.int(1), heap.int(2), heap.str("k"));
        heap.list_append(inst, one).unwrap();
        heap.list_append(inst, two).unwrap();
        heap.dict_set(inst, key, inst).unwrap();
        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump(&mut heap, inst, proto);
            let loaded = load(&mut other, &stream).unwrap();
            match *other.get(loaded) {
                Object::Instance(ref i) => {
                    assert_eq!(i.list_items.len(), 2);
                    assert_eq!(i.dict_items.len(), 1);
                    assert_eq!(i.dict_items[0].1, loaded);
                }
                ref other => panic!("not an instance: {:?}", other),
            }
        }
    }

    /// Keeps its coordinates in a tuple state.
    struct PointHooks;

    impl ClassHooks for PointHooks {
        fn getstate(&self, heap: &mut Heap, obj: ObjRef) -> Result<Option<ObjRef>> {
            let x = heap.getattr(obj, "x").unwrap();
            let y = heap.getattr(obj, "y").unwrap();
            Ok(Some(heap.tuple(vec![x, y])))
        }

        fn setstate(&self, heap: &mut Heap, obj: ObjRef, state: ObjRef) -> Result<bool> {
            let coords = items(heap, state);
            heap.setattr(obj, "x", coords[0]).map_err(Error::Syntax)?;
            heap.setattr(obj, "y", coords[1]).map_err(Error::Syntax)?;
            Ok(true)
        }
    }

    #[test]
    fn getstate_and_setstate() {
        let mut registry = Registry::new();
        registry.register_class(QualName::new("geo", "Point"), PointHooks);
        let mut heap = Heap::new();
        let class = heap.global("geo", "Point");
        let point = heap.instance(class, false);
        let (x, y) = (heap.float(1.5), heap.float(-2.0));
        heap.setattr(point, "x", x).unwrap();
        heap.setattr(point, "y", y).unwrap();

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump_to_vec(&mut heap, &registry, point, opts(proto)).unwrap();
            let loaded = load_from_slice(&stream, &mut other, &registry,
                                         UnpickleOptions::new()).unwrap();
            assert!(heap.equivalent(point, &other, loaded), "protocol {}", proto);
        }
    }

    /// Pickled by name, like a module-level singleton.
    struct SingletonHooks;

    impl ClassHooks for SingletonHooks {
        fn reduce_ex(&self, heap: &mut Heap, _obj: ObjRef, _proto: u8) -> Result<Option<ObjRef>> {
            Ok(Some(heap.str("NOTHING")))
        }
    }

    #[test]
    fn reduce_to_global_name() {
        let mut registry = Registry::new();
        registry.register_class(QualName::new("mod", "Sentinel"), SingletonHooks);
        let mut heap = Heap::new();
        let class = heap.global("mod", "Sentinel");
        let inst = heap.instance(class, false);
        let stream = dump_to_vec(&mut heap, &registry, inst, opts(2)).unwrap();
        assert_eq!(stream, b"\x80\x02cmod\nNOTHING\nq\x00.");
    }

    fn decimal_registry() -> Registry {
        let decimal = QualName::new("decimal", "Decimal");
        let mut registry = Registry::new();
        registry.register_reducer(decimal.clone(), |heap: &mut Heap, obj: ObjRef| {
            let text = match *heap.get(obj) {
                Object::Native(ref n) => String::from_utf8(n.data.clone()).unwrap(),
                _ => unreachable!(),
            };
            let cls = heap.global("decimal", "Decimal");
            let text = heap.str(text);
            let args = heap.tuple(vec![text]);
            Ok(heap.tuple(vec![cls, args]))
        });
        registry.register_callable(decimal.clone(), move |heap: &mut Heap, args: &[ObjRef]| {
            let text = heap.str_of(args[0]);
            Ok(heap.native(decimal.clone(), text.into_bytes()))
        });
        registry
    }

    #[test]
    fn natives_through_registered_reducers() {
        let registry = decimal_registry();
        let mut heap = Heap::new();
        let dec = heap.native(QualName::new("decimal", "Decimal"), b"1.5".to_vec());
        let stream = dump_to_vec(&mut heap, &registry, dec, opts(2)).unwrap();
        assert_eq!(stream, &b"\x80\x02cdecimal\nDecimal\nq\x00X\x03\x00\x00\x001.5q\x01\
                              \x85q\x02Rq\x03."[..]);

        let mut other = Heap::new();
        for proto in 0..3 {
            let stream = dump_to_vec(&mut heap, &registry, dec, opts(proto)).unwrap();
            let loaded = load_from_slice(&stream, &mut other, &registry,
                                         UnpickleOptions::new()).unwrap();
            assert!(heap.equivalent(dec, &other, loaded), "protocol {}", proto);
        }
        // Without a reducer, natives cannot be pickled at all.
        let err = dump_to_vec(&mut heap, &Registry::new(), dec, opts(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unpickleable);
    }

    #[test]
    fn malformed_reductions() {
        let class = QualName::new("mod", "Bad");
        let cases: Vec<(fn(&mut Heap) -> ObjRef, &str)> = vec![
            (|heap: &mut Heap| heap.int(1), "must be a tuple"),
            (|heap: &mut Heap| {
                let none = heap.none();
                heap.tuple(vec![none])
            }, "two to five elements"),
            (|heap: &mut Heap| {
                let f = heap.global("mod", "f");
                let args = heap.int(1);
                heap.tuple(vec![f, args])
            }, "must be a tuple"),
        ];
        for (make, message) in cases {
            let mut registry = Registry::new();
            registry.register_reducer(class.clone(), move |heap: &mut Heap, _| Ok(make(heap)));
            let mut heap = Heap::new();
            let native = heap.native(class.clone(), vec![]);
            match dump_to_vec(&mut heap, &registry, native, opts(2)) {
                Err(Error::Pickle(ErrorCode::Pickling(ref msg))) if msg.contains(message) => {}
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn snapshots_of_heaps() {
        let mut heap = Heap::new();
        let value = pyobj!(l=[t=(i=1, s="a"), d={s="k" => f=0.5}]);
        let root = heap.insert_value(&value);
        assert_eq!(heap.to_value(root).unwrap(), value);
        let native = heap.native(QualName::new("m", "N"), vec![]);
        assert_eq!(heap.to_value(native).unwrap_err().kind(), ErrorKind::Value);
    }
}

mod memo_tests {
    use crate::MemoTable;

    #[test]
    fn grows_and_finds_everything() {
        let mut memo: MemoTable<u32> = MemoTable::new();
        assert_eq!(memo.capacity(), 13);
        for i in 0..6 {
            memo.put(i, i, i * 3).unwrap();
        }
        assert_eq!(memo.capacity(), 13);
        memo.put(6, 6, 18).unwrap();
        assert_eq!(memo.capacity(), 61);

        for i in 7..5000 {
            memo.put(i * 7919, i, i * 3).unwrap();
        }
        assert_eq!(memo.size(), 5000);
        assert!(memo.capacity() >= 2 * memo.size());
        for i in 0..7 {
            assert_eq!(memo.find_position(i, i * 3), Some(i));
        }
        for i in 7..5000 {
            assert_eq!(memo.find_position(i * 7919, i * 3), Some(i));
            assert_eq!(memo.find_value(i * 7919, i * 3), Some(i * 3));
        }
        assert_eq!(memo.find_position(1, 4), None);
    }

    #[test]
    fn entries_match_key_and_value() {
        let mut memo: MemoTable<char> = MemoTable::new();
        memo.put(5, 0, 'a').unwrap();
        memo.put(5, 1, 'b').unwrap();
        assert_eq!(memo.size(), 2);
        assert_eq!(memo.find_position(5, 'a'), Some(0));
        assert_eq!(memo.find_position(5, 'b'), Some(1));
        // Storing again updates the position in place.
        memo.put(5, 9, 'a').unwrap();
        assert_eq!(memo.size(), 2);
        assert_eq!(memo.find_position(5, 'a'), Some(9));
        memo.clear();
        assert_eq!(memo.size(), 0);
        assert_eq!(memo.find_position(5, 'a'), None);
    }
}

mod heap_tests {
    use num_bigint::BigInt;
    use crate::{dump_to_vec, load_from_slice};
    use crate::{ErrorCode, ErrorKind, Heap, PickleOptions, Registry, UnpickleOptions};

    #[test]
    fn dict_keys_compare_by_value() {
        let mut heap = Heap::new();
        let dict = heap.dict();
        let (one, one_value) = (heap.int(1), heap.str("int"));
        heap.dict_set(dict, one, one_value).unwrap();
        // 1.0, True and a long 1 are the same key as the int 1.
        let float_one = heap.float(1.0);
        let long_one = heap.long(BigInt::from(1));
        let float_value = heap.str("float");
        heap.dict_set(dict, float_one, float_value).unwrap();
        assert_eq!(heap.dict_items(dict).len(), 1);
        assert_eq!(heap.dict_get(dict, long_one), Some(float_value));
        assert_eq!(heap.dict_get(dict, heap.bool(true)), Some(float_value));
        assert_eq!(heap.dict_get(dict, heap.bool(false)), None);

        let list = heap.list(vec![]);
        let key = heap.tuple(vec![one, list]);
        assert_eq!(heap.dict_set(dict, key, one).unwrap_err(), ErrorCode::ValueNotHashable);
        let key = heap.tuple(vec![one, long_one]);
        heap.dict_set(dict, key, one).unwrap();
        let other = heap.tuple(vec![float_one, one]);
        assert_eq!(heap.dict_get(dict, other), Some(one));
    }

    #[test]
    fn repr_is_python_style() {
        let mut heap = Heap::new();
        let items = vec![heap.int(-3), heap.float(0.5), heap.str("it's"), heap.bytes(&b"a\x00"[..])];
        let tuple = heap.tuple(vec![heap.none()]);
        let list = heap.list(items);
        heap.list_append(list, tuple).unwrap();
        heap.list_append(list, list).unwrap();
        assert_eq!(heap.repr(list), r#"[-3, 0.5, "it's", b'a\x00', (None,), [...]]"#);

        let class = heap.global("mod", "Cls");
        let inst = heap.instance(class, true);
        assert_eq!(heap.repr(inst), "<mod.Cls instance>");
        assert_eq!(heap.type_name(inst), "Cls");
        assert_eq!(heap.str_of(class), "<class 'mod.Cls'>");
        let text = heap.str("plain");
        assert_eq!(heap.str_of(text), "plain");
    }

    #[test]
    fn deeply_nested_stream() {
        const DEPTH: usize = 100_000;
        let mut stream = b"\x80\x02".to_vec();
        stream.extend(std::iter::repeat(b']').take(DEPTH));
        stream.extend(std::iter::repeat(b'a').take(DEPTH - 1));
        stream.push(b'.');

        let mut heap = Heap::new();
        let root = load_from_slice(&stream, &mut heap, &Registry::new(),
                                   UnpickleOptions::new()).unwrap();

        let expected = format!("{}...{}", "[".repeat(200), "]".repeat(200));
        assert_eq!(heap.repr(root), expected);
        assert_eq!(heap.str_of(root), expected);
        assert!(heap.equivalent(root, &heap.clone(), root));

        let err = heap.to_value(root).unwrap_err();
        assert_eq!(err.code(), Some(&ErrorCode::MaxDepthExceeded));
        let err = dump_to_vec(&mut heap, &Registry::new(), root, PickleOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Depth);
    }

    #[test]
    fn dict_lookup_after_replacement() {
        let mut heap = Heap::new();
        let dict = heap.dict();
        for i in 0..1000 {
            let (key, value) = (heap.str(format!("k{}", i)), heap.int(i));
            heap.dict_set(dict, key, value).unwrap();
        }
        let (key, value) = (heap.str("k500"), heap.int(-1));
        heap.dict_set(dict, key, value).unwrap();
        assert_eq!(heap.dict_items(dict).len(), 1000);
        let found = heap.dict_get_str(dict, "k500").unwrap();
        assert_eq!(found, value);
        // Replacement keeps the original position.
        assert_eq!(heap.dict_items(dict)[500].1, value);
        assert_eq!(heap.dict_get_str(dict, "k1000"), None);

        let pair = {
            let (a, b) = (heap.int(1), heap.str("x"));
            heap.tuple(vec![a, b])
        };
        heap.dict_set(dict, pair, value).unwrap();
        let lookup = {
            let (a, b) = (heap.float(1.0), heap.str("x"));
            heap.tuple(vec![a, b])
        };
        assert_eq!(heap.dict_get(dict, lookup), Some(value));
    }
}
