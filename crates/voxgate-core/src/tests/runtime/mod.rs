mod session_runtime;
