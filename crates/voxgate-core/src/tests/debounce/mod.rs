mod debounce_gate;
