use pretty_assertions::assert_eq;

use crate::types::{
    decode, format, hide_method_numbers, render, strip_synthetic_suffix, DecodeError,
    FieldRecord, MethodRecord, Primitive, TypeDescriptor,
};

#[test]
fn decodes_primitives() {
    for (code, name) in [
        ('B', "byte"),
        ('C', "char"),
        ('D', "double"),
        ('F', "float"),
        ('I', "int"),
        ('J', "long"),
        ('S', "short"),
        ('V', "void"),
        ('Z', "boolean"),
    ] {
        let t = decode(&code.to_string()).unwrap();
        assert_eq!(t, TypeDescriptor::Primitive(Primitive::from_code(code).unwrap()));
        assert_eq!(render(&t, false), name);
        assert_eq!(render(&t, true), name);
    }
}

#[test]
fn decodes_objects_and_arrays() {
    let string = decode("Ljava/lang/String;").unwrap();
    assert_eq!(string, TypeDescriptor::Object("java/lang/String".to_string()));
    assert_eq!(string.render(false), "java.lang.String");
    assert_eq!(string.render(true), "String");

    let ints = decode("[I").unwrap();
    assert_eq!(ints.render(false), "int[]");

    let grid = decode("[[Ljava/lang/String;").unwrap();
    assert_eq!(grid.render(false), "java.lang.String[][]");
    assert_eq!(grid.render(true), "String[][]");
    assert_eq!(grid.to_string(), "[[Ljava/lang/String;");
}

#[test]
fn default_package_and_inner_classes() {
    let t = decode("LParams;").unwrap();
    assert_eq!(t.render(false), "Params");
    assert_eq!(t.render(true), "Params");

    // Inner class separators are part of the simple name
    let inner = decode("Landroid/view/View$OnClickListener;").unwrap();
    assert_eq!(inner.render(false), "android.view.View$OnClickListener");
    assert_eq!(inner.render(true), "View$OnClickListener");
}

#[test]
fn rejects_unknown_primitives() {
    assert_eq!(decode("Q"), Err(DecodeError::UnknownPrimitive('Q')));
    assert_eq!(decode("[[Q"), Err(DecodeError::UnknownPrimitive('Q')));
    assert_eq!(
        decode("Q").unwrap_err().to_string(),
        "Unknown type: Q"
    );
}

#[test]
fn rejects_malformed_tokens() {
    for token in ["", "[", "L;", "Lfoo", "Ljava/lang/String", "II", "Lfoo;I", "[L;"] {
        assert_eq!(
            decode(token),
            Err(DecodeError::Malformed(token.to_string())),
            "token {token:?}"
        );
    }
}

#[test]
fn array_dimension_limit() {
    let deepest = format!("{}I", "[".repeat(255));
    let t = decode(&deepest).unwrap();
    assert_eq!(t.render(true), format!("int{}", "[]".repeat(255)));

    let too_deep = format!("{}I", "[".repeat(256));
    assert!(matches!(decode(&too_deep), Err(DecodeError::Malformed(_))));
}

#[test]
fn formats_signature_lines() {
    let init = MethodRecord::from_descriptors("Ljava/lang/Object;", "<init>", &[], "V").unwrap();
    assert_eq!(format(&init), "java.lang.Object <init>()");
    assert_eq!(init.to_string(), "java.lang.Object <init>()");

    let record = MethodRecord::from_descriptors(
        "Lcom/example/Foo;",
        "bar",
        &["I", "[Ljava/lang/String;", "Landroid/os/Bundle;", "[[J"],
        "Ljava/lang/String;",
    )
    .unwrap();
    assert_eq!(
        format(&record),
        "com.example.Foo bar(int, String[], Bundle, long[][])"
    );

    let array_owner =
        MethodRecord::from_descriptors("[Ljava/lang/Object;", "clone", &[], "Ljava/lang/Object;")
            .unwrap();
    assert_eq!(format(&array_owner), "java.lang.Object[] clone()");
}

#[test]
fn record_construction_propagates_decode_errors() {
    let err = MethodRecord::from_descriptors("LFoo;", "bar", &["I", "Q"], "V").unwrap_err();
    assert_eq!(err, DecodeError::UnknownPrimitive('Q'));
    let err = MethodRecord::from_descriptors("LFoo;", "bar", &[], "Lfoo").unwrap_err();
    assert_eq!(err, DecodeError::Malformed("Lfoo".to_string()));
}

#[test]
fn synthetic_suffixes() {
    assert_eq!(strip_synthetic_suffix("access$000"), "access");
    assert_eq!(strip_synthetic_suffix("access$lambda$12"), "access$lambda");
    assert_eq!(strip_synthetic_suffix("run"), "run");
    assert_eq!(strip_synthetic_suffix("$1"), "$1");
    assert_eq!(strip_synthetic_suffix("access$"), "access$");
    assert_eq!(strip_synthetic_suffix("access$00a"), "access$00a");

    let record =
        MethodRecord::from_descriptors("LOuter;", "access$100", &["LOuter;"], "I").unwrap();
    assert_eq!(record.render(false), "Outer access$100(Outer)");
    assert_eq!(record.render(true), "Outer access(Outer)");
}

#[test]
fn lambda_bodies_lose_their_inner_counter() {
    assert_eq!(
        hide_method_numbers("lambda$refreshSessionToken$14$MainActivity"),
        "lambda$refreshSessionToken$MainActivity"
    );
    assert_eq!(hide_method_numbers("lambda$onCreate$0$1"), "lambda$onCreate$1");
    // Only a counter between two `$` is dropped; a trailing one is part of the name.
    assert_eq!(hide_method_numbers("lambda$run$0"), "lambda$run$0");
    assert_eq!(hide_method_numbers("lambda$new$x$Main"), "lambda$new$x$Main");
    assert_eq!(hide_method_numbers("access$000"), "access");
    assert_eq!(hide_method_numbers("run"), "run");
}

#[test]
fn lambda_classes_lose_their_counter() {
    let lambda = decode("Lcom/example/Main$$Lambda$26;").unwrap();
    assert_eq!(lambda.without_lambda_suffix(), decode("Lcom/example/Main$$Lambda;").unwrap());

    let lambdas = decode("[[Lcom/example/Main$$Lambda$3;").unwrap();
    assert_eq!(lambdas.without_lambda_suffix().render(false), "com.example.Main$$Lambda[][]");

    for unchanged in ["Lcom/example/Outer$1;", "Lcom/example/Main$$Lambda;", "LMain$$Lambda$a;", "I"] {
        let t = decode(unchanged).unwrap();
        assert_eq!(t.without_lambda_suffix(), t, "{unchanged}");
    }

    let record = MethodRecord::from_descriptors(
        "Lcom/example/Main$$Lambda$26;",
        "lambda$refreshSessionToken$14$MainActivity",
        &["Lcom/example/Main$$Lambda$26;"],
        "V",
    )
    .unwrap();
    assert_eq!(
        record.render(true),
        "com.example.Main$$Lambda lambda$refreshSessionToken$MainActivity(Main$$Lambda$26)"
    );
}

#[test]
fn formats_field_lines() {
    let field = FieldRecord::from_descriptors("Lcom/example/Main$1;", "this$0", "Lcom/example/Main;")
        .unwrap();
    assert_eq!(field.to_string(), "com.example.Main$1 this$0: Main");
    assert_eq!(field.render(true), "com.example.Main$1 this$0: Main");

    let captured =
        FieldRecord::from_descriptors("Lcom/example/Main$$Lambda$7;", "f$0", "[I").unwrap();
    assert_eq!(captured.render(false), "com.example.Main$$Lambda$7 f$0: int[]");
    assert_eq!(captured.render(true), "com.example.Main$$Lambda f$0: int[]");
}
