use super::{Checker, Fixture, Outcome};
use crate::core::status::Code;

/// A named conformance check, run once per scheme.
pub struct Case {
    pub name: &'static str,
    pub run: fn(&Fixture) -> Outcome,
}

pub const CASES: &[Case] = &[
    Case { name: "translate_name", run: translate_name },
    Case { name: "create_file", run: create_file },
    Case { name: "create_file_non_existing", run: create_file_non_existing },
    Case { name: "create_file_existing_dir", run: create_file_existing_dir },
    Case { name: "create_file_path_is_invalid", run: create_file_path_is_invalid },
    Case { name: "append_file", run: append_file },
    Case { name: "append_file_non_existing", run: append_file_non_existing },
    Case { name: "append_file_existing_dir", run: append_file_existing_dir },
    Case { name: "create_then_append_file", run: create_then_append_file },
    Case { name: "append_file_path_is_invalid", run: append_file_path_is_invalid },
    Case { name: "read_file", run: read_file },
    Case { name: "read_file_non_existing", run: read_file_non_existing },
    Case { name: "read_file_existing_dir", run: read_file_existing_dir },
    Case { name: "create_then_read_file", run: create_then_read_file },
    Case { name: "read_file_path_is_invalid", run: read_file_path_is_invalid },
    Case { name: "create_dir", run: create_dir },
    Case { name: "create_dir_no_parent", run: create_dir_no_parent },
    Case { name: "create_dir_which_is_file", run: create_dir_which_is_file },
    Case { name: "create_dir_twice", run: create_dir_twice },
    Case { name: "create_dir_path_is_invalid", run: create_dir_path_is_invalid },
];

const CREATE_DIR_UNSUPPORTED: &str = "create_dir() not supported";
const NEW_WRITABLE_FILE_UNSUPPORTED: &str = "new_writable_file() not supported";

fn translate_name(fx: &Fixture) -> Outcome {
    let backend = match fx.env().resolve(&fx.uri_for("some_path")) {
        Ok(backend) => backend,
        Err(_) => return Outcome::skipped("No filesystem registered"),
    };
    let mut check = Checker::new();

    if fx.scheme().is_empty() {
        for (name, expected) in [
            ("", ""),
            ("/", "/"),
            ("//", "/"),
            ("a_file", "a_file"),
            ("a_dir/..", "."),
        ] {
            check.expect_eq(
                &format!("translate_name({:?})", name),
                &backend.translate_name(name),
                expected,
            );
        }
    } else {
        for suffix in ["://", ":///", ":////"] {
            let uri = format!("{}{}", fx.scheme(), suffix);
            check.expect_eq(
                &format!("translate_name({:?})", uri),
                &backend.translate_name(&uri),
                "/",
            );
        }
    }

    for (path, expected) in [
        ("a_file", "/a_file"),
        ("a_dir/a_file", "/a_dir/a_file"),
        ("./a_file", "/a_file"),
        ("a/convoluted/../path/./to/.//.///a/file", "/a/path/to/a/file"),
    ] {
        let translated = backend.translate_name(&fx.uri_for(path));
        check.expect_eq(
            &format!("translate_name(<root>/{})", path),
            fx.relative_path(&translated),
            expected,
        );
    }

    check.finish()
}

fn create_file(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_writable_file(&fx.uri_for("a_file"));
    check.expect_code("new_writable_file(a_file)", &status, Code::Ok);
    check.finish()
}

fn create_file_non_existing(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_writable_file(&fx.uri_for("dir_not_found/a_file"));
    check.expect_code("new_writable_file(dir_not_found/a_file)", &status, Code::NotFound);
    check.finish()
}

fn create_file_existing_dir(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    if fx.env().create_dir(&path).is_err() {
        return Outcome::skipped(CREATE_DIR_UNSUPPORTED);
    }

    let mut check = Checker::new();
    let status = fx.env().new_writable_file(&path);
    check.expect_code("new_writable_file(<dir>)", &status, Code::FailedPrecondition);
    check.finish()
}

fn create_file_path_is_invalid(fx: &Fixture) -> Outcome {
    let _file = match fx.env().new_writable_file(&fx.uri_for("a_file")) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().new_writable_file(&fx.uri_for("a_file/a_file"));
    check.expect_code("new_writable_file(a_file/a_file)", &status, Code::FailedPrecondition);
    check.finish()
}

fn append_file(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_appendable_file(&fx.uri_for("a_file"));
    check.expect_code("new_appendable_file(a_file)", &status, Code::Ok);
    check.finish()
}

fn append_file_non_existing(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_appendable_file(&fx.uri_for("dir_not_found/a_file"));
    check.expect_code("new_appendable_file(dir_not_found/a_file)", &status, Code::NotFound);
    check.finish()
}

fn append_file_existing_dir(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    if fx.env().create_dir(&path).is_err() {
        return Outcome::skipped(CREATE_DIR_UNSUPPORTED);
    }

    let mut check = Checker::new();
    let status = fx.env().new_appendable_file(&path);
    check.expect_code("new_appendable_file(<dir>)", &status, Code::FailedPrecondition);
    check.finish()
}

fn create_then_append_file(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    let _file = match fx.env().new_writable_file(&path) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().new_appendable_file(&path);
    check.expect_code("new_appendable_file(a_file)", &status, Code::Ok);
    check.finish()
}

fn append_file_path_is_invalid(fx: &Fixture) -> Outcome {
    let _file = match fx.env().new_writable_file(&fx.uri_for("a_file")) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().new_appendable_file(&fx.uri_for("a_file/a_file"));
    check.expect_code("new_appendable_file(a_file/a_file)", &status, Code::FailedPrecondition);
    check.finish()
}

fn read_file(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_random_access_file(&fx.uri_for("a_file"));
    check.expect_code("new_random_access_file(a_file)", &status, Code::NotFound);
    check.finish()
}

fn read_file_non_existing(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().new_random_access_file(&fx.uri_for("dir_not_found/a_file"));
    check.expect_code(
        "new_random_access_file(dir_not_found/a_file)",
        &status,
        Code::NotFound,
    );
    check.finish()
}

fn read_file_existing_dir(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    if fx.env().create_dir(&path).is_err() {
        return Outcome::skipped(CREATE_DIR_UNSUPPORTED);
    }

    let mut check = Checker::new();
    let status = fx.env().new_random_access_file(&path);
    check.expect_code("new_random_access_file(<dir>)", &status, Code::FailedPrecondition);
    check.finish()
}

fn create_then_read_file(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    let _file = match fx.env().new_writable_file(&path) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().new_random_access_file(&path);
    check.expect_code("new_random_access_file(a_file)", &status, Code::Ok);
    check.finish()
}

fn read_file_path_is_invalid(fx: &Fixture) -> Outcome {
    let _file = match fx.env().new_writable_file(&fx.uri_for("a_file")) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().new_random_access_file(&fx.uri_for("a_file/a_file"));
    check.expect_code(
        "new_random_access_file(a_file/a_file)",
        &status,
        Code::FailedPrecondition,
    );
    check.finish()
}

fn create_dir(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().create_dir(&fx.uri_for("a_dir"));
    check.expect_code("create_dir(a_dir)", &status, Code::Ok);
    check.finish()
}

fn create_dir_no_parent(fx: &Fixture) -> Outcome {
    let mut check = Checker::new();
    let status = fx.env().create_dir(&fx.uri_for("dir_not_found/a_dir"));
    check.expect_code("create_dir(dir_not_found/a_dir)", &status, Code::NotFound);
    check.finish()
}

fn create_dir_which_is_file(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_file");
    let _file = match fx.env().new_writable_file(&path) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().create_dir(&path);
    check.expect_code("create_dir(<file>)", &status, Code::AlreadyExists);
    check.finish()
}

fn create_dir_twice(fx: &Fixture) -> Outcome {
    let path = fx.uri_for("a_dir");
    if fx.env().create_dir(&path).is_err() {
        return Outcome::skipped(CREATE_DIR_UNSUPPORTED);
    }

    let mut check = Checker::new();
    let status = fx.env().create_dir(&path);
    check.expect_code("create_dir(a_dir) again", &status, Code::AlreadyExists);
    check.finish()
}

fn create_dir_path_is_invalid(fx: &Fixture) -> Outcome {
    let _file = match fx.env().new_writable_file(&fx.uri_for("a_file")) {
        Ok(file) => file,
        Err(_) => return Outcome::skipped(NEW_WRITABLE_FILE_UNSUPPORTED),
    };

    let mut check = Checker::new();
    let status = fx.env().create_dir(&fx.uri_for("a_file/a_dir"));
    check.expect_code("create_dir(a_file/a_dir)", &status, Code::FailedPrecondition);
    check.finish()
}
