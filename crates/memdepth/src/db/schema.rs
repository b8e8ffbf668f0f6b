//! Database schema definition for memdepth.

/// Database schema definition.
///
/// Positional tables are unique on their source position; `types` is unique
/// on the canonical name. Those keys are what makes every write find-or-create.
pub(crate) const SCHEMA: &str = r"
-- Source files. Row 1 is the 'unknown' sentinel.
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE
);

-- Interned types, one row per canonical name
CREATE TABLE IF NOT EXISTS types (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    length INTEGER
);

CREATE TABLE IF NOT EXISTS type_ints (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    signed INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS type_arrays (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    base_id INTEGER NOT NULL REFERENCES types(id),
    size INTEGER NOT NULL
);

-- Pointer and slice element types
CREATE TABLE IF NOT EXISTS type_elems (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    base_id INTEGER NOT NULL REFERENCES types(id)
);

CREATE TABLE IF NOT EXISTS type_maps (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    key_id INTEGER NOT NULL REFERENCES types(id),
    value_id INTEGER NOT NULL REFERENCES types(id)
);

CREATE TABLE IF NOT EXISTS type_chans (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    direction TEXT NOT NULL,
    base_id INTEGER NOT NULL REFERENCES types(id)
);

-- Struct fields and interface methods/embeddings, in order
CREATE TABLE IF NOT EXISTS type_members (
    type_id INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    embedded INTEGER NOT NULL,
    name TEXT,
    member_type_id INTEGER NOT NULL REFERENCES types(id),
    PRIMARY KEY (type_id, position)
);

CREATE TABLE IF NOT EXISTS type_named (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    package TEXT,
    name TEXT NOT NULL,
    underlying_id INTEGER NOT NULL REFERENCES types(id)
);

CREATE TABLE IF NOT EXISTS type_funcs (
    type_id INTEGER PRIMARY KEY REFERENCES types(id) ON DELETE CASCADE,
    is_variadic INTEGER NOT NULL,
    is_generic INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS type_func_sigs (
    type_id INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    position INTEGER NOT NULL,
    member_type_id INTEGER NOT NULL REFERENCES types(id),
    name TEXT,
    PRIMARY KEY (type_id, role, position)
);

CREATE TABLE IF NOT EXISTS type_unions (
    type_id INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    term_type_id INTEGER NOT NULL REFERENCES types(id),
    tilde INTEGER NOT NULL,
    PRIMARY KEY (type_id, position)
);

-- Functions and function literals
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY,
    name TEXT,
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    is_variadic INTEGER NOT NULL,
    is_generic INTEGER NOT NULL,
    is_literal INTEGER NOT NULL,
    parent_id INTEGER REFERENCES functions(id),
    type_id INTEGER REFERENCES types(id),
    UNIQUE (file_id, line, column)
);

CREATE INDEX IF NOT EXISTS idx_functions_name ON functions(name);

CREATE TABLE IF NOT EXISTS function_sigs (
    function_id INTEGER NOT NULL REFERENCES functions(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    position INTEGER NOT NULL,
    type_id INTEGER REFERENCES types(id),
    name TEXT,
    PRIMARY KEY (function_id, role, position)
);

-- Variables. Row 1 is the 'unknown' sentinel.
-- function_id is NULL for package-level variables.
CREATE TABLE IF NOT EXISTS variables (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    type_id INTEGER REFERENCES types(id),
    is_global INTEGER NOT NULL,
    is_const INTEGER NOT NULL,
    function_id INTEGER REFERENCES functions(id),
    UNIQUE (file_id, line, column)
);

CREATE INDEX IF NOT EXISTS idx_variables_name ON variables(name);

CREATE TABLE IF NOT EXISTS local_variables (
    variable_id INTEGER PRIMARY KEY REFERENCES variables(id) ON DELETE CASCADE,
    is_param INTEGER NOT NULL,
    is_result INTEGER NOT NULL,
    is_receiver INTEGER NOT NULL
);

-- Statements
-- function_id is the outermost enclosing function, parent_function_id the innermost
CREATE TABLE IF NOT EXISTS statements (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    function_id INTEGER REFERENCES functions(id),
    parent_function_id INTEGER REFERENCES functions(id),
    UNIQUE (file_id, line, column, end_line, end_column)
);

CREATE INDEX IF NOT EXISTS idx_statements_kind ON statements(kind);

CREATE TABLE IF NOT EXISTS stmt_assign_operands (
    stmt_id INTEGER NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    side TEXT NOT NULL CHECK (side IN ('lhs', 'rhs')),
    position INTEGER NOT NULL,
    expr_id INTEGER NOT NULL REFERENCES expressions(id),
    PRIMARY KEY (stmt_id, side, position)
);

CREATE TABLE IF NOT EXISTS stmt_return_results (
    stmt_id INTEGER NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    expr_id INTEGER NOT NULL REFERENCES expressions(id),
    PRIMARY KEY (stmt_id, position)
);

CREATE TABLE IF NOT EXISTS stmt_defers (
    stmt_id INTEGER PRIMARY KEY REFERENCES statements(id) ON DELETE CASCADE,
    call_expr_id INTEGER NOT NULL REFERENCES expressions(id)
);

CREATE TABLE IF NOT EXISTS stmt_type_switches (
    stmt_id INTEGER PRIMARY KEY REFERENCES statements(id) ON DELETE CASCADE,
    bound_name TEXT,
    assert_expr_id INTEGER NOT NULL REFERENCES expressions(id)
);

CREATE TABLE IF NOT EXISTS stmt_type_switch_cases (
    stmt_id INTEGER NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    clause INTEGER NOT NULL,
    position INTEGER NOT NULL,
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    type_id INTEGER REFERENCES types(id),
    PRIMARY KEY (stmt_id, clause, position)
);

-- Expressions
CREATE TABLE IF NOT EXISTS expressions (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    type_id INTEGER REFERENCES types(id),
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    function_id INTEGER REFERENCES functions(id),
    parent_function_id INTEGER REFERENCES functions(id),
    UNIQUE (file_id, line, column, end_line, end_column)
);

CREATE INDEX IF NOT EXISTS idx_expressions_kind ON expressions(kind);

-- def_* is set only when the definition lies inside the corpus root
CREATE TABLE IF NOT EXISTS expr_idents (
    expr_id INTEGER PRIMARY KEY REFERENCES expressions(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    def_file_id INTEGER REFERENCES files(id),
    def_line INTEGER,
    def_column INTEGER
);

CREATE TABLE IF NOT EXISTS expr_selectors (
    expr_id INTEGER PRIMARY KEY REFERENCES expressions(id) ON DELETE CASCADE,
    base_expr_id INTEGER NOT NULL REFERENCES expressions(id),
    field TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expr_type_asserts (
    expr_id INTEGER PRIMARY KEY REFERENCES expressions(id) ON DELETE CASCADE,
    base_expr_id INTEGER NOT NULL REFERENCES expressions(id),
    type_id INTEGER REFERENCES types(id)
);

-- One row per argument; a call without arguments has one row with NULL arg_expr_id
CREATE TABLE IF NOT EXISTS expr_calls (
    expr_id INTEGER NOT NULL REFERENCES expressions(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    function_expr_id INTEGER NOT NULL REFERENCES expressions(id),
    arg_expr_id INTEGER REFERENCES expressions(id),
    PRIMARY KEY (expr_id, position)
);

-- Memory accesses, one per classified expression.
-- base_variable_id is NULL exactly when uncertainty > 0; an unresolvable
-- root with no uncertainty points at the sentinel variable.
CREATE TABLE IF NOT EXISTS memory_accesses (
    expr_id INTEGER PRIMARY KEY REFERENCES expressions(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    inner_expr_id INTEGER REFERENCES memory_accesses(expr_id),
    base_name TEXT,
    base_variable_id INTEGER REFERENCES variables(id),
    depth INTEGER NOT NULL,
    uncertainty INTEGER NOT NULL CHECK (uncertainty >= 0),
    CHECK ((base_variable_id IS NULL) = (uncertainty > 0))
);

CREATE INDEX IF NOT EXISTS idx_memory_accesses_kind ON memory_accesses(kind);
CREATE INDEX IF NOT EXISTS idx_memory_accesses_base ON memory_accesses(base_variable_id);

-- make(T, ...) sites for slices, maps and channels; capacity -1 when not a literal
CREATE TABLE IF NOT EXISTS make_sites (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    container TEXT NOT NULL,
    capacity INTEGER NOT NULL,
    UNIQUE (file_id, line, column)
);

-- make([]T, ...) and new(T) sites with byte sizes; size -1 when unknown
CREATE TABLE IF NOT EXISTS sized_alloc_sites (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    builtin TEXT NOT NULL CHECK (builtin IN ('make', 'new')),
    type_name TEXT NOT NULL,
    size INTEGER NOT NULL,
    UNIQUE (file_id, line, column)
);
";

/// Rows every database starts with.
///
/// Applied after [`SCHEMA`] and after truncation.
pub(crate) const SENTINELS: &str = r"
INSERT OR IGNORE INTO files (id, path) VALUES (1, '<unknown>');
INSERT OR IGNORE INTO variables (id, name, file_id, line, column, type_id, is_global, is_const, function_id)
    VALUES (1, '<unknown>', 1, 0, 0, NULL, 1, 0, NULL);
";

/// Tables in deletion order (dependents first).
pub(crate) const TABLES_CHILD_FIRST: &[&str] = &[
    "sized_alloc_sites",
    "make_sites",
    "memory_accesses",
    "expr_calls",
    "expr_type_asserts",
    "expr_selectors",
    "expr_idents",
    "stmt_type_switch_cases",
    "stmt_type_switches",
    "stmt_defers",
    "stmt_return_results",
    "stmt_assign_operands",
    "expressions",
    "statements",
    "local_variables",
    "variables",
    "function_sigs",
    "functions",
    "type_unions",
    "type_func_sigs",
    "type_funcs",
    "type_named",
    "type_members",
    "type_chans",
    "type_maps",
    "type_elems",
    "type_arrays",
    "type_ints",
    "types",
    "files",
];
